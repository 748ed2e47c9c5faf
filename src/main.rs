use std::process::ExitCode;

use git_hulahoop::error::HulahoopError;

fn main() -> ExitCode {
    match git_hulahoop::run() {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<HulahoopError>() {
                // user input problems get a single line, no context chain
                Some(HulahoopError::Validation(message)) => eprintln!("{message}"),
                _ => eprintln!("Error: {e:?}"),
            }

            ExitCode::FAILURE
        }
    }
}
