/// Redis key layout for field rows and their satellites.
///
/// `lua/apply_plan.lua` builds the same keys from the base returned by [`KeyContext::base`];
/// the two must change together.
#[derive(Debug, Clone)]
pub struct KeyContext<'a> {
    pub prefix: &'a str,
    pub service: &'a str,
}

impl<'a> KeyContext<'a> {
    pub fn new(prefix: &'a str, service: &'a str) -> Self {
        Self { prefix, service }
    }

    pub fn base(&self) -> String {
        format!("{}:{}", self.prefix, self.service)
    }

    pub fn field(&self, field_id: &str) -> String {
        format!("{}:{}:fields:{}", self.prefix, self.service, field_id)
    }

    pub fn range(&self, range_id: &str) -> String {
        format!("{}:{}:ranges:{}", self.prefix, self.service, range_id)
    }

    /// Join row pointing a field at its range; the value is the range id.
    pub fn field_range(&self, field_id: &str) -> String {
        format!("{}:{}:field_ranges:{}", self.prefix, self.service, field_id)
    }

    /// List of choice option rows kept in position order.
    pub fn choice_options(&self, field_id: &str) -> String {
        format!("{}:{}:choice_options:{}", self.prefix, self.service, field_id)
    }

    pub fn setting_autocomplete(&self, field_id: &str) -> String {
        format!("{}:{}:setting_autocomplete:{}", self.prefix, self.service, field_id)
    }

    /// Guard key holding the id of the field that owns `name` for `owner_id`.
    pub fn unique_name(&self, owner_id: i64, name: &str) -> String {
        format!("{}:{}:fields:unique:{}", self.prefix, self.service, name_key(owner_id, name))
    }

    /// Glob matching every key written under this prefix and service.
    pub fn service_pattern(&self) -> String {
        format!("{}:{}:*", self.prefix, self.service)
    }
}

/// Logical uniqueness key for a field name, shared by both store implementations.
pub fn name_key(owner_id: i64, name: &str) -> String {
    format!("{owner_id}:{name}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_satellite_keys() {
        let ctx = KeyContext::new("ff", "forms");
        assert_eq!(ctx.field("fld_1"), "ff:forms:fields:fld_1");
        assert_eq!(ctx.range("rng_1"), "ff:forms:ranges:rng_1");
        assert_eq!(ctx.field_range("fld_1"), "ff:forms:field_ranges:fld_1");
        assert_eq!(ctx.choice_options("fld_1"), "ff:forms:choice_options:fld_1");
        assert_eq!(ctx.setting_autocomplete("fld_1"), "ff:forms:setting_autocomplete:fld_1");
    }

    #[test]
    fn unique_name_key_embeds_owner() {
        let ctx = KeyContext::new("ff", "forms");
        assert_eq!(ctx.unique_name(7, "color"), "ff:forms:fields:unique:7:color");
        assert_eq!(ctx.service_pattern(), "ff:forms:*");
    }
}
