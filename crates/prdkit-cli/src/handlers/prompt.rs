//! Prompt command handler.
//!
//! Prints the rendered PRD prompt so templates can be checked without a
//! running model.

use anyhow::Result;
use prdkit_core::PrdForm;
use prdkit_core::prompt::{detect_healthcare_context, prd_prompt};

/// Validate the form and render its prompt.
pub fn render(form: &PrdForm) -> Result<String> {
    form.validate()?;
    Ok(prd_prompt(form))
}

/// Execute the prompt command.
pub fn execute(form: &PrdForm) -> Result<()> {
    let prompt = render(form)?;
    let probe = format!(
        "{} {} {}",
        form.feature_name, form.problem_statement, form.business_objective
    );
    if detect_healthcare_context(&probe) {
        eprintln!("Healthcare context detected; compliance guidance included.");
    }
    println!("{prompt}");
    Ok(())
}
