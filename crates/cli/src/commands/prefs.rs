//! Preference commands.

use reklama_core::Language;
use reklama_storefront::error::Result;
use reklama_storefront::state::AppState;
use secrecy::SecretString;

/// Show the current language, or switch to `code`.
#[allow(clippy::print_stdout)]
pub fn lang(state: &AppState, code: Option<&str>) -> Result<()> {
    let Some(code) = code else {
        let current = state.preferences().language();
        for language in Language::ALL {
            let marker = if language == current { "*" } else { " " };
            println!("{marker} {} ({})", language.code(), language.name());
        }
        return Ok(());
    };

    let language: Language = code.parse()?;
    state.preferences().set_language(language)?;
    println!("Language set to {}", language.name());
    Ok(())
}

/// Store the admin token used for subsequent API requests.
#[allow(clippy::print_stdout)]
pub fn set_admin_token(state: &AppState, token: String) -> Result<()> {
    state
        .preferences()
        .set_admin_token(&SecretString::from(token))?;
    println!("Admin token saved");
    Ok(())
}

/// Forget the stored admin token.
#[allow(clippy::print_stdout)]
pub fn clear_admin_token(state: &AppState) -> Result<()> {
    state.preferences().clear_admin_token()?;
    println!("Admin token cleared");
    Ok(())
}
