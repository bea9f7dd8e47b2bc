use flash_derive::flash_error;
use std::borrow::Cow;

#[flash_error]
pub enum DemoError {
    #[error("IO error{}: {source}", format_context(.context))]
    Io {
        #[source]
        source: std::io::Error,
        context: Option<Cow<'static, str>>,
    },

    #[error("Rejected{}: {message}", format_context(.context))]
    Rejected { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Internal error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

fn read() -> Result<Vec<u8>, DemoError> {
    std::fs::read("/definitely/not/here").context("Reading demo file")
}

fn reject() -> Result<(), DemoError> {
    Err(DemoError::Rejected { message: "nope".into(), context: None }).context("Checking input")
}

fn main() {
    let io = read().unwrap_err();
    assert!(io.to_string().contains("(Reading demo file)"));

    let rejected = reject().unwrap_err();
    assert_eq!(rejected.to_string(), "Rejected (Checking input): nope");

    let internal: DemoError = "boom".into();
    assert_eq!(internal.to_string(), "Internal error: boom");
}
