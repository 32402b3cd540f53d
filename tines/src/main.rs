use std::env;
use std::str::FromStr;
use tfplug::ServerConfig;
use tines::TinesProvider;

/// Map TF_LOG onto a tracing level. Terraform also accepts JSON, which we
/// treat as TRACE.
fn log_level() -> tracing::Level {
    match env::var("TF_LOG") {
        Ok(value) if value.eq_ignore_ascii_case("json") => tracing::Level::TRACE,
        Ok(value) => tracing::Level::from_str(&value).unwrap_or(tracing::Level::INFO),
        Err(_) => tracing::Level::INFO,
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // stdout carries the plugin handshake
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(log_level())
        .init();

    let exe = env::current_exe()?;
    let exe_dir = exe.parent().ok_or("provider executable has no parent directory")?;
    let config = ServerConfig::new()
        .with_cert_path(exe_dir.join("../../certs/localhost+2.pem"))
        .with_key_path(exe_dir.join("../../certs/localhost+2-key.pem"))
        .with_env_overrides();

    tfplug::serve(TinesProvider::new(), config).await?;

    Ok(())
}
