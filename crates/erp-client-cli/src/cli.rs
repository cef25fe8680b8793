use clap::{Parser, Subcommand};
use erp_client_core::Environment;

#[derive(Parser, Debug)]
#[command(name = "erp", author, version, about = "Command-line client for the ERP API", long_about = None)]
pub struct Cli {
    /// Environment profile (development, qa, production).
    /// Without it, ERP_ENVIRONMENT or the saved profile is used.
    #[arg(short, long = "env")]
    pub environment: Option<Environment>,

    /// Keep credentials in the OS keychain instead of the cache directory
    #[arg(long, env = "ERP_USE_KEYRING")]
    pub keyring: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Log in and store the session
    Login {
        #[arg(short, long, env = "ERP_EMAIL")]
        email: Option<String>,
    },
    /// Forget the stored session
    Logout,
    /// Show the cached user without contacting the server
    Whoami,
    /// Fetch the authenticated user's profile
    Profile,
    /// Register a new user
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "user")]
        role: String,
        #[arg(long)]
        tenant_id: Option<String>,
    },
    /// Update a user's name, role or active flag
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        role: Option<String>,
        #[arg(long)]
        active: Option<bool>,
    },
    /// Delete a user
    Delete { id: String },
    /// List users one page at a time
    List {
        #[arg(long, default_value_t = 10)]
        limit: u32,
        #[arg(long, default_value_t = 0)]
        offset: u32,
    },
    /// Print the total number of users
    Count,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list_defaults() {
        let cli = Cli::try_parse_from(["erp", "list"]).unwrap();
        match cli.command {
            Command::List { limit, offset } => {
                assert_eq!(limit, 10);
                assert_eq!(offset, 0);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_environment_and_update() {
        let cli = Cli::try_parse_from(["erp", "--env", "qa", "update", "u-1", "--active", "false"]).unwrap();
        assert_eq!(cli.environment, Some(Environment::Qa));
        match cli.command {
            Command::Update { id, active, name, .. } => {
                assert_eq!(id, "u-1");
                assert_eq!(active, Some(false));
                assert!(name.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_environment_is_rejected() {
        assert!(Cli::try_parse_from(["erp", "--env", "staging", "count"]).is_err());
    }

    #[test]
    fn test_environment_variable_is_left_to_config() {
        std::env::set_var("ERP_ENVIRONMENT", "staging");
        let cli = Cli::try_parse_from(["erp", "count"]);
        let resolved = erp_client_core::Config::default().environment();
        std::env::remove_var("ERP_ENVIRONMENT");

        assert!(cli.unwrap().environment.is_none());
        assert_eq!(resolved, Environment::Development);
    }
}
