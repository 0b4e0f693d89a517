//! Development server command.

use std::sync::Arc;

use anyhow::Result;
use aoike_plugin::{resolve_config, BuildConfiguration};
use aoike_server::{DevServer, RunningServer};

use crate::banner;
use crate::config::build_configuration;

/// Resolve the configuration and bind the dev server.
///
/// Returns the site title for the banner along with the bound server.
async fn start(configuration: BuildConfiguration) -> Result<(String, RunningServer)> {
    let (config, plugins) = resolve_config(configuration)?;

    tracing::debug!(
        "Serving {} with plugins {:?}",
        config.root.display(),
        plugins.names()
    );

    let title = config.title.clone();
    let server = DevServer::new(config, Arc::new(plugins)).listen().await?;

    Ok((title, server))
}

/// Run the dev server until the process is killed.
pub async fn run(color: bool) -> Result<()> {
    let (title, server) = start(build_configuration()).await?;

    banner::print(&title, server.url(), color);

    server.serve().await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use aoike_plugin::PluginContainer;
    use aoike_server::ServerError;
    use std::fs;
    use tempfile::tempdir;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    #[tokio::test]
    async fn serves_fixture_and_prints_banner() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("note.md"), "**bold**\n").unwrap();

        let mut configuration = build_configuration();
        configuration.project_root = temp.path().to_path_buf();
        let (mut config, plugins) = resolve_config(configuration).unwrap();
        config.server.port = 0;
        let title = config.title.clone();

        let server = DevServer::new(config, Arc::new(plugins))
            .listen()
            .await
            .unwrap();
        let banner = banner::render(&title, server.url(), false);
        let addr = server.local_addr().unwrap();
        tokio::spawn(server.serve());

        assert!(banner.starts_with("\n  Aoike\n"));
        assert!(banner.contains("Preview"));
        assert!(banner.contains("http://"));

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /note.md HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();

        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.ends_with("export default \"**bold**\\n\";"));
    }

    #[tokio::test]
    async fn reports_bind_failure() {
        let blocker = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = blocker.local_addr().unwrap().port();

        let temp = tempdir().unwrap();
        let mut configuration = build_configuration();
        configuration.project_root = temp.path().to_path_buf();
        let (mut config, _) = resolve_config(configuration).unwrap();
        config.server.port = port;

        let result = DevServer::new(config, Arc::new(PluginContainer::default()))
            .listen()
            .await;

        assert!(matches!(result, Err(ServerError::BindError(_, _))));
    }
}
