use crate::commands::{CREATE_EXAMPLES, DELETE_EXAMPLES, SHOW_EXAMPLES, UPDATE_EXAMPLES};

#[derive(Clone, Copy)]
pub struct ExampleGroup {
    pub title: &'static str,
    pub commands: &'static [&'static str],
}

#[derive(Clone, Copy)]
pub struct CommandExample {
    pub name: &'static str,
    pub groups: &'static [ExampleGroup],
}

pub fn command_examples() -> &'static [CommandExample] {
    &[
        CommandExample {
            name: "create",
            groups: CREATE_EXAMPLES,
        },
        CommandExample {
            name: "show",
            groups: SHOW_EXAMPLES,
        },
        CommandExample {
            name: "update",
            groups: UPDATE_EXAMPLES,
        },
        CommandExample {
            name: "delete",
            groups: DELETE_EXAMPLES,
        },
    ]
}
