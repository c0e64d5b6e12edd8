/// User-triggered assistant actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    GenerateIcon,
    FetchLogo,
    RemoveBackground,
}

/// Registration record for one named action: how hosts address it, whether
/// it needs text input, and the fixed user-facing messages around it.
#[derive(Clone, Copy, Debug)]
pub struct CommandSpec {
    pub command: &'static str,
    pub action: Action,
    pub input_required: bool,
    pub blank_message: &'static str,
    pub success_message: &'static str,
}

const GENERATE: CommandSpec = CommandSpec {
    command: "generate",
    action: Action::GenerateIcon,
    input_required: true,
    blank_message: "Please enter a description for the icon",
    success_message: "✓ Icon generated and added to slide!",
};

const LOGO: CommandSpec = CommandSpec {
    command: "logo",
    action: Action::FetchLogo,
    input_required: true,
    blank_message: "Please enter a company or brand name",
    success_message: "✓ Logo added to slide!",
};

// The input for background removal is the live selection, not text.
const REMOVE_BACKGROUND: CommandSpec = CommandSpec {
    command: "remove_background",
    action: Action::RemoveBackground,
    input_required: false,
    blank_message: "",
    success_message: "✓ Background removed!",
};

pub const COMMANDS: &[CommandSpec] = &[GENERATE, LOGO, REMOVE_BACKGROUND];

pub fn find_command(name: &str) -> Option<&'static CommandSpec> {
    COMMANDS.iter().find(|spec| spec.command == name)
}

impl Action {
    pub fn spec(&self) -> &'static CommandSpec {
        match self {
            Action::GenerateIcon => &GENERATE,
            Action::FetchLogo => &LOGO,
            Action::RemoveBackground => &REMOVE_BACKGROUND,
        }
    }

    pub fn name(&self) -> &'static str {
        self.spec().command
    }
}
