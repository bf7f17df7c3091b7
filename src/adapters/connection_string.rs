// 接続文字列ビルダー
//
// Config と Platform から sqlx の接続URLを生成する。

use crate::core::config::Config;
use crate::core::platform::Platform;

/// ホスト指定の解釈結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostSpec {
    /// TCP接続
    Tcp { host: String, port: Option<u16> },
    /// UNIXソケット
    Socket { host: String, path: String },
}

/// `dbhost` を解釈する
///
/// "host", "host:port", "host:/path/to/socket", "[::1]:5432" を受け付けます。
/// ポート部分が数値でない場合はホスト名の一部として扱います。
pub fn parse_host(dbhost: &str) -> HostSpec {
    if let Some(rest) = dbhost.strip_prefix('[') {
        if let Some((host, tail)) = rest.split_once(']') {
            let port = tail.strip_prefix(':').and_then(|p| p.parse().ok());
            return HostSpec::Tcp {
                host: format!("[{}]", host),
                port,
            };
        }
    }

    match dbhost.split_once(':') {
        Some((host, tail)) if tail.starts_with('/') => HostSpec::Socket {
            host: host.to_string(),
            path: tail.to_string(),
        },
        Some((host, tail)) => match tail.parse::<u16>() {
            Ok(port) => HostSpec::Tcp {
                host: host.to_string(),
                port: Some(port),
            },
            Err(_) => HostSpec::Tcp {
                host: dbhost.to_string(),
                port: None,
            },
        },
        None => HostSpec::Tcp {
            host: dbhost.to_string(),
            port: None,
        },
    }
}

/// プラットフォームの既定ポート
pub fn default_port(platform: Platform) -> Option<u16> {
    match platform {
        Platform::MySQL => Some(3306),
        Platform::PostgreSQL => Some(5432),
        Platform::Oracle => Some(1521),
        Platform::SQLite => None,
    }
}

/// 接続文字列を生成
///
/// SQLiteの場合は `<datadirectory>/<dbname>.db` を作成モードで開きます。
pub fn build_connection_string(platform: Platform, config: &Config) -> String {
    match platform {
        Platform::SQLite => format!(
            "sqlite://{}?mode=rwc",
            config
                .datadirectory
                .join(format!("{}.db", config.dbname))
                .display()
        ),
        Platform::PostgreSQL => {
            let user = config.dbuser.as_deref().unwrap_or("postgres");
            network_url("postgresql", platform, user, config, "host")
        }
        Platform::MySQL => {
            let user = config.dbuser.as_deref().unwrap_or("root");
            network_url("mysql", platform, user, config, "socket")
        }
        Platform::Oracle => {
            let user = config.dbuser.as_deref().unwrap_or("system");
            network_url("oracle", platform, user, config, "socket")
        }
    }
}

fn network_url(
    scheme: &str,
    platform: Platform,
    user: &str,
    config: &Config,
    socket_param: &str,
) -> String {
    let auth = match config.dbpassword.as_deref() {
        Some(password) if !password.is_empty() => format!("{}:{}", user, password),
        _ => user.to_string(),
    };

    match parse_host(&config.dbhost) {
        HostSpec::Tcp { host, port } => {
            let port = port.or(default_port(platform)).unwrap_or_default();
            format!(
                "{}://{}@{}:{}/{}",
                scheme, auth, host, port, config.dbname
            )
        }
        HostSpec::Socket { host, path } => {
            let host = if host.is_empty() { "localhost".to_string() } else { host };
            format!(
                "{}://{}@{}/{}?{}={}",
                scheme, auth, host, config.dbname, socket_param, path
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(yaml: &str) -> Config {
        yaml.parse().unwrap()
    }

    #[test]
    fn test_parse_host_variants() {
        assert_eq!(
            parse_host("localhost"),
            HostSpec::Tcp {
                host: "localhost".to_string(),
                port: None
            }
        );
        assert_eq!(
            parse_host("db:5433"),
            HostSpec::Tcp {
                host: "db".to_string(),
                port: Some(5433)
            }
        );
        assert_eq!(
            parse_host("localhost:/run/mysqld.sock"),
            HostSpec::Socket {
                host: "localhost".to_string(),
                path: "/run/mysqld.sock".to_string()
            }
        );
        assert_eq!(
            parse_host("[::1]:3307"),
            HostSpec::Tcp {
                host: "[::1]".to_string(),
                port: Some(3307)
            }
        );
    }

    #[test]
    fn test_sqlite_url() {
        let config = config("dbname: cloud\ndatadirectory: /var/data\n");
        assert_eq!(
            build_connection_string(Platform::SQLite, &config),
            "sqlite:///var/data/cloud.db?mode=rwc"
        );
    }

    #[test]
    fn test_postgres_url_default_port() {
        let config = config("dbtype: pgsql\ndbname: cloud\ndbuser: admin\ndbpassword: pw\n");
        assert_eq!(
            build_connection_string(Platform::PostgreSQL, &config),
            "postgresql://admin:pw@localhost:5432/cloud"
        );
    }

    #[test]
    fn test_mysql_url_with_socket() {
        let config = config("dbtype: mysql\ndbname: cloud\ndbhost: \"localhost:/tmp/mysql.sock\"\n");
        assert_eq!(
            build_connection_string(Platform::MySQL, &config),
            "mysql://root@localhost/cloud?socket=/tmp/mysql.sock"
        );
    }
}
