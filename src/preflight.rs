//! `--preflight`: a quick report on whether the workspace is usable from this machine

use std::fmt::Write as _;
use std::net::ToSocketAddrs;
use std::path::Path;

use crate::environment::EnvMap;

pub const DNS_HOST: &str = "api.openai.com";

/// Create `dir` and write/remove a probe file in it
pub fn can_write(dir: &Path) -> bool {
    let probe = dir.join(".__write_test__");
    let ok = std::fs::create_dir_all(dir)
        .and_then(|_| std::fs::write(&probe, b"ok"))
        .and_then(|_| std::fs::remove_file(&probe));
    ok.is_ok()
}

pub fn dns_ok(host: &str) -> bool {
    (host, 443)
        .to_socket_addrs()
        .map(|mut addrs| addrs.next().is_some())
        .unwrap_or(false)
}

fn is_set(env: &EnvMap, key: &str) -> bool {
    env.get(key).is_some_and(|v| !v.is_empty())
}

/// Build the report; `dns` is injected so tests stay offline
pub fn report(root: &Path, env: &EnvMap, dns: impl Fn(&str) -> bool) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "== Preflight ==");
    let _ = writeln!(out, "OS: {} ({})", std::env::consts::OS, std::env::consts::FAMILY);
    let _ = writeln!(out, "Arch: {}", std::env::consts::ARCH);
    let _ = writeln!(out, "USB root: {}", root.display());

    let _ = writeln!(out, "\n[Write tests]");
    let _ = writeln!(out, "Write USB cache: {}", can_write(&root.join("cache")));
    let _ = writeln!(out, "Write USB tmp: {}", can_write(&root.join("tmp")));
    let _ = writeln!(
        out,
        "Write tempdir: {}",
        can_write(&std::env::temp_dir().join("usbdev_test"))
    );

    let _ = writeln!(out, "\n[Network]");
    let _ = writeln!(out, "DNS {}: {}", DNS_HOST, dns(DNS_HOST));

    let _ = writeln!(out, "\n[Env]");
    let _ = writeln!(out, "OPENAI_API_KEY set: {}", is_set(env, "OPENAI_API_KEY"));
    let _ = writeln!(
        out,
        "HTTP_PROXY set: {}",
        is_set(env, "HTTP_PROXY") || is_set(env, "HTTPS_PROXY")
    );
    out
}
