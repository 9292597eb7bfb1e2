use redis::Script;
use std::sync::LazyLock;

pub const APPLY_PLAN_SCRIPT_BODY: &str = include_str!("../../lua/apply_plan.lua");

pub static APPLY_PLAN_SCRIPT: LazyLock<Script> = LazyLock::new(|| Script::new(APPLY_PLAN_SCRIPT_BODY));
