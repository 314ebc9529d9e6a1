//! Subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand};
use prdkit_core::{
    DEFAULT_FALLBACK_MODEL, DEFAULT_GENERATE_URL, DEFAULT_PORT, DEFAULT_PREFERRED_MODEL, PrdForm,
};

/// Available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Run the web server
    Serve {
        /// Port to listen on
        #[arg(short, long, env = "PORT", default_value_t = DEFAULT_PORT)]
        port: u16,
        /// Interface to bind
        #[arg(long, default_value = "0.0.0.0")]
        host: String,
        /// Ollama generate endpoint
        #[arg(long, env = "OLLAMA_URL", default_value = DEFAULT_GENERATE_URL)]
        ollama_url: String,
        /// Model to use when Ollama has it
        #[arg(short, long, env = "PRDKIT_MODEL", default_value = DEFAULT_PREFERRED_MODEL)]
        model: String,
        /// Model to use when the preferred one is missing
        #[arg(long, default_value = DEFAULT_FALLBACK_MODEL)]
        fallback_model: String,
        /// Sampling temperature
        #[arg(long, default_value_t = 0.2)]
        temperature: f32,
        /// Seconds to wait for Ollama before giving up on a request
        #[arg(long, default_value_t = 300)]
        timeout_secs: u64,
        /// Directory of static UI assets to serve
        #[arg(long, env = "PRDKIT_STATIC_DIR")]
        static_dir: Option<PathBuf>,
    },

    /// Check that the web server and Ollama are reachable
    Diagnose {
        /// Port the web server is expected on
        #[arg(short, long, env = "PORT", default_value_t = DEFAULT_PORT)]
        port: u16,
        /// Ollama generate endpoint
        #[arg(long, env = "OLLAMA_URL", default_value = DEFAULT_GENERATE_URL)]
        ollama_url: String,
        /// Model expected to be pulled
        #[arg(short, long, env = "PRDKIT_MODEL", default_value = DEFAULT_PREFERRED_MODEL)]
        model: String,
    },

    /// Print the PRD prompt for a set of inputs without calling Ollama
    Prompt(PromptArgs),
}

/// PRD form fields given on the command line.
#[derive(Args, Debug, Clone)]
pub struct PromptArgs {
    /// Feature name
    #[arg(long)]
    pub feature: String,
    /// Problem statement
    #[arg(long)]
    pub problem: String,
    /// Business objective
    #[arg(long, default_value = "")]
    pub objective: String,
    /// Success metrics
    #[arg(long, default_value = "")]
    pub metrics: String,
    /// Target persona
    #[arg(long, default_value = "")]
    pub persona: String,
    /// Constraints
    #[arg(long, default_value = "")]
    pub constraints: String,
}

impl From<PromptArgs> for PrdForm {
    fn from(args: PromptArgs) -> Self {
        Self {
            feature_name: args.feature,
            problem_statement: args.problem,
            business_objective: args.objective,
            success_metrics: args.metrics,
            target_persona: args.persona,
            constraints: args.constraints,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::Cli;
    use clap::Parser;

    use super::*;

    #[test]
    fn test_serve_defaults() {
        let cli = Cli::parse_from(["prdkit", "serve", "--port", "4000"]);
        let Some(Commands::Serve {
            port,
            host,
            model,
            fallback_model,
            ..
        }) = cli.command
        else {
            panic!("expected serve");
        };
        assert_eq!(port, 4000);
        assert_eq!(host, "0.0.0.0");
        assert_eq!(fallback_model, "mistral");
        assert!(!model.is_empty());
    }

    #[test]
    fn test_prompt_args_into_form() {
        let cli = Cli::parse_from([
            "prdkit",
            "prompt",
            "--feature",
            "Bulk export",
            "--problem",
            "Exports time out",
            "--persona",
            "Admins",
        ]);
        let Some(Commands::Prompt(args)) = cli.command else {
            panic!("expected prompt");
        };
        let form = PrdForm::from(args);
        assert_eq!(form.feature_name, "Bulk export");
        assert_eq!(form.target_persona, "Admins");
        assert!(form.constraints.is_empty());
    }
}
