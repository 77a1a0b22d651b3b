use std::time::{Duration, Instant};
use testcontainers::GenericImage;
use testcontainers::clients::Cli;
use testcontainers::core::WaitFor;

use dbsync_core::{ConnectionSpec, EngineKind};

/// Starts a disposable PostgreSQL container and hands the caller a
/// [`ConnectionSpec`] pointed at it. The container is torn down when `run`
/// returns, since the guard returned by `docker.run` lives only for the
/// duration of this call.
pub fn with_postgres<T, E, F>(run: F) -> Result<T, E>
where
    F: FnOnce(ConnectionSpec) -> Result<T, E>,
{
    let docker = Cli::default();
    let image = GenericImage::new("postgres", "16")
        .with_env_var("POSTGRES_USER", "postgres")
        .with_env_var("POSTGRES_PASSWORD", "postgres")
        .with_env_var("POSTGRES_DB", "postgres")
        .with_exposed_port(5432)
        .with_wait_for(WaitFor::message_on_stdout(
            "database system is ready to accept connections",
        ));

    let container = docker.run(image);
    let port = container.get_host_port_ipv4(5432);

    run(ConnectionSpec {
        name: "live-postgres".to_string(),
        engine: EngineKind::Postgresql,
        host: "127.0.0.1".to_string(),
        port,
        user: "postgres".to_string(),
        password: "postgres".to_string(),
        database: "postgres".to_string(),
    })
}

/// Starts a disposable MySQL container and hands the caller a
/// [`ConnectionSpec`] pointed at it.
pub fn with_mysql<T, E, F>(run: F) -> Result<T, E>
where
    F: FnOnce(ConnectionSpec) -> Result<T, E>,
{
    let docker = Cli::default();
    let image = GenericImage::new("mysql", "8.4")
        .with_env_var("MYSQL_ROOT_PASSWORD", "root")
        .with_env_var("MYSQL_DATABASE", "testdb")
        .with_exposed_port(3306)
        .with_wait_for(WaitFor::message_on_stderr("ready for connections"));

    let container = docker.run(image);
    let port = container.get_host_port_ipv4(3306);

    run(ConnectionSpec {
        name: "live-mysql".to_string(),
        engine: EngineKind::Mysql,
        host: "127.0.0.1".to_string(),
        port,
        user: "root".to_string(),
        password: "root".to_string(),
        database: "testdb".to_string(),
    })
}

/// Polls `operation` until it succeeds or `timeout` elapses. Used by
/// integration tests waiting on a freshly started container to accept
/// connections.
pub fn retry_db_operation<T, F>(
    timeout: Duration,
    mut operation: F,
) -> Result<T, dbsync_core::DbError>
where
    F: FnMut() -> Result<T, dbsync_core::DbError>,
{
    let deadline = Instant::now() + timeout;

    loop {
        match operation() {
            Ok(value) => return Ok(value),
            Err(error) => {
                if Instant::now() >= deadline {
                    return Err(error);
                }
            }
        }

        std::thread::sleep(Duration::from_millis(250));
    }
}
