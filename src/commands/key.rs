//! Key testing commands.

use std::io;

use anyhow::Result;
use clap::Args;
use keychat::validator::curl_equivalent;
use keychat::{AppError, AppState, Config};

use super::{output, resolve_credential};

/// Key test arguments.
#[derive(Args, Debug)]
pub struct TestArgs {
    /// Ask for the key even if OPENAI_API_KEY is set
    #[arg(long)]
    pub prompt_key: bool,
}

/// Run the key test; exits non-zero when the key is not valid.
pub async fn run_test(config: Config, args: TestArgs) -> Result<()> {
    let credential = match resolve_credential(&config, args.prompt_key) {
        Ok(credential) => Some(credential),
        Err(AppError::MissingCredential) => None,
        Err(e) => return Err(e.into()),
    };

    let state = AppState::new(config, None)?;
    let result = match &credential {
        Some(credential) => state.validator.validate_credential(credential).await,
        None => state.validator.validate("").await,
    };

    output::print_validation_to(&mut io::stdout(), &result)?;

    if !result.ok {
        std::process::exit(1);
    }
    Ok(())
}

/// Print the curl command equivalent to the key test.
pub fn run_curl(config: &Config) -> Result<()> {
    println!("{}", curl_equivalent(&config.openai_api_url));
    Ok(())
}
