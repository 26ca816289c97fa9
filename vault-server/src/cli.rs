//! Hand-parsed CLI flags, in the teacher's `src/cli.rs` style: a flat
//! `while i < args.len()` loop over `&[String]`, no argument-parsing crate.

#[derive(Default, Debug)]
pub struct CliArgs {
    pub transports: Vec<String>,
    pub http_host: Option<String>,
    pub http_port: Option<u16>,
    pub rpc_port: Option<u16>,
    pub key_dir: Option<String>,
    pub key_id: Option<String>,
    pub dim: Option<u32>,
}

pub fn parse(args: &[String]) -> Result<CliArgs, String> {
    let mut out = CliArgs::default();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--transport" => {
                i += 1;
                out.transports.push(args.get(i).ok_or("missing value for --transport")?.clone());
            }
            "--http-host" => {
                i += 1;
                out.http_host = Some(args.get(i).ok_or("missing value for --http-host")?.clone());
            }
            "--http-port" => {
                i += 1;
                let raw = args.get(i).ok_or("missing value for --http-port")?;
                out.http_port = Some(raw.parse().map_err(|_| format!("invalid --http-port: {raw}"))?);
            }
            "--rpc-port" => {
                i += 1;
                let raw = args.get(i).ok_or("missing value for --rpc-port")?;
                out.rpc_port = Some(raw.parse().map_err(|_| format!("invalid --rpc-port: {raw}"))?);
            }
            "--key-dir" => {
                i += 1;
                out.key_dir = Some(args.get(i).ok_or("missing value for --key-dir")?.clone());
            }
            "--key-id" => {
                i += 1;
                out.key_id = Some(args.get(i).ok_or("missing value for --key-id")?.clone());
            }
            "--dim" => {
                i += 1;
                let raw = args.get(i).ok_or("missing value for --dim")?;
                out.dim = Some(raw.parse().map_err(|_| format!("invalid --dim: {raw}"))?);
            }
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            other => return Err(format!("unknown option: {other}")),
        }
        i += 1;
    }
    Ok(out)
}

fn print_usage() {
    eprintln!(
        r#"vault-server — the Vault trust-boundary service

USAGE:
    vault-server [OPTIONS]

OPTIONS:
    --transport <stdio|http|rpc>   Transport to run (repeatable; default: http)
    --http-host <HOST>             HTTP bind host (default: 0.0.0.0)
    --http-port <PORT>             HTTP bind port (default: 8080)
    --rpc-port <PORT>              Binary RPC bind port (default: 50080)
    --key-dir <DIR>                Keyset directory (default: vault_keys)
    --key-id <ID>                  Key identifier (default: vault-key)
    --dim <N>                      Vector dimension for key generation (default: 1024)
    -h, --help                     Print help

All options may also be set via environment variables (VAULT_*); CLI flags
take precedence. See SPEC_FULL.md §6.3.
"#
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_repeated_transport_flags() {
        let parsed = parse(&args(&["--transport", "http", "--transport", "rpc"])).unwrap();
        assert_eq!(parsed.transports, vec!["http", "rpc"]);
    }

    #[test]
    fn rejects_unknown_flag() {
        assert!(parse(&args(&["--bogus"])).is_err());
    }

    #[test]
    fn rejects_non_numeric_port() {
        assert!(parse(&args(&["--http-port", "not-a-number"])).is_err());
    }
}
