use std::{
    env,
    process::Command,
    time::{SystemTime, UNIX_EPOCH},
};

const VERSION_VAR: &str = "GITDEX_VERSION";

fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/index");
    println!("cargo:rerun-if-env-changed={}", VERSION_VAR);

    // Packagers building from a source tarball have no git metadata.
    let version = match env::var(VERSION_VAR) {
        Ok(pinned) if !pinned.trim().is_empty() => pinned.trim().to_string(),
        _ => describe_version(),
    };

    println!("cargo:rustc-env={}={}", VERSION_VAR, version);
}

fn describe_version() -> String {
    let output = Command::new("git")
        .args(["describe", "--tags", "--always", "--dirty"])
        .output();

    match output {
        Ok(o) if o.status.success() => {
            let described = String::from_utf8_lossy(&o.stdout).trim().to_string();
            let version = described.strip_prefix('v').unwrap_or(&described);

            if version.is_empty() || version.ends_with("-dirty") {
                format!("{}-{}", version, timestamp())
            } else {
                version.to_string()
            }
        }
        _ => format!("{}-unknown-{}", env!("CARGO_PKG_VERSION"), timestamp()),
    }
}

fn timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
