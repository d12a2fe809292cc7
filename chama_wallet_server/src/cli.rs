use std::{env, env::VarError};

/// There's no real CLI for the server, so just do quick 'n dirty
pub fn handle_command_line_args() -> bool {
    let has_cli_args = env::args().count() > 1;
    if has_cli_args {
        // We don't expect any CLI args, so always print the help
        display_readme();
        display_envs();
    }
    has_cli_args
}

fn display_readme() {
    const README: &str = include_str!("./cli-help.txt");
    println!("\n{README}\n");
}

fn display_envs() {
    // Secrets (CHAMA_PAYSTACK_SECRET_KEY, CHAMA_PROXY_SECRET) are deliberately absent from this list
    const DISPLAY_ENVS: [&str; 13] = [
        "RUST_LOG",
        "CHAMA_HOST",
        "CHAMA_PORT",
        "CHAMA_DATABASE_URL",
        "CHAMA_PLATFORM_FEE_BPS",
        "CHAMA_PAYSTACK_BASE_URL",
        "CHAMA_PAYSTACK_CALLBACK_URL",
        "CHAMA_PAYSTACK_TIMEOUT_SECS",
        "CHAMA_PAYSTACK_SIGNATURE_CHECKS",
        "CHAMA_USER_ID_HEADER",
        "CHAMA_PAYOUT_WORKER",
        "CHAMA_PAYOUT_INTERVAL_SECS",
        "CHAMA_NOTIFICATION_WEBHOOK_URL",
    ];

    println!("Current environment values (EXCLUDING variables that contain secrets):");
    DISPLAY_ENVS.iter().for_each(|&name| {
        let val = match env::var(name) {
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<35} {val:<15}");
    })
}
