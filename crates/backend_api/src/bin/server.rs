use backend_api::{run_server, RestLedgerRepository};
use ledger_client::{ClientConfig, RestClient};
use std::sync::Arc;
use std::{env, path::PathBuf};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Optional settings file merged with environment overrides
    let settings_path = env::var("SETTINGS_PATH").ok().map(PathBuf::from);
    let settings = settings_loader::resolve_runtime_settings(settings_path.as_ref())?;

    println!("Ledger Dashboard API Server");
    println!("===========================");

    // Pre-flight check
    let Some(settings) = settings else {
        eprintln!("[FATAL] No backend configured.");
        eprintln!("        Provide settings.json (or SETTINGS_PATH) with a backend_url,");
        eprintln!("        or set the LEDGER_BACKEND_URL environment variable.");
        std::process::exit(1);
    };

    println!("Backend URL: {}", settings.backend_url);
    println!(
        "Default company: {}",
        settings
            .default_company_id
            .as_deref()
            .unwrap_or("(per-request)")
    );
    println!("Listening on: {}:{}", settings.host, settings.port);
    println!();

    // Create the repository over the REST facade
    let client = RestClient::new(ClientConfig::from_settings(&settings))?;
    let repo = Arc::new(RestLedgerRepository::new(
        client,
        settings.default_company_id.clone(),
    ));

    // Start the server
    run_server(repo, &settings.host, settings.port).await?;

    Ok(())
}
