use thiserror::Error;

#[derive(Error, Debug)]
pub enum SheriffError {
    #[error("operation not permitted while in observer mode")]
    ObserverMode,

    #[error("no such deputy: `{0}`")]
    UnknownDeputy(String),

    #[error("no such command id: `{0}`")]
    UnknownCommand(u32),

    #[error("exhausted retry budget while drawing a free sheriff id")]
    IdExhaustion,

    #[error("script `{0}` already exists")]
    DuplicateScript(String),

    #[error("no such script: `{0}`")]
    UnknownScript(String),

    #[error("cannot remove script `{0}` while a script is active")]
    ScriptActive(String),
}
