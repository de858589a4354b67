use std::{
    path::{Path, PathBuf},
    process::{self, Command},
};

type DynError = Box<dyn std::error::Error>;
type Result<T> = std::result::Result<T, DynError>;

fn main() {
    let matches = clap::Command::new("xtask")
        .version("0.1.0")
        .about("Build support for the consoled crate")
        .subcommand(clap::Command::new("build").about("Builds consoled"))
        .subcommand(clap::Command::new("test").about("Runs unit and scenario tests"))
        .subcommand(clap::Command::new("clippy").about("Runs clippy"))
        .subcommand(clap::Command::new("clean").about("Cargo clean"))
        .get_matches();
    if let Err(e) = match matches.subcommand() {
        Some(("build", _)) => build(),
        Some(("test", _)) => test(),
        Some(("clippy", _)) => clippy(),
        Some(("clean", _)) => clean(),
        _ => Err("bad subcommand".into()),
    } {
        eprintln!("{}", e);
        process::exit(1);
    }
}

fn cargo() -> String {
    std::env::var("CARGO").unwrap_or_else(|_| "cargo".to_string())
}

fn build() -> Result<()> {
    let status = Command::new(cargo())
        .current_dir(workspace())
        .args(["build", "--workspace", "--exclude", "xtask"])
        .status()?;
    if !status.success() {
        return Err("build failed".into());
    }
    Ok(())
}

fn test() -> Result<()> {
    let status = Command::new(cargo())
        .current_dir(workspace())
        .args(["test", "--workspace", "--exclude", "xtask"])
        .status()?;
    if !status.success() {
        return Err("test failed".into());
    }
    Ok(())
}

fn clippy() -> Result<()> {
    let status = Command::new(cargo())
        .current_dir(workspace())
        .args(["clippy", "--workspace", "--exclude", "xtask"])
        .status()?;
    if !status.success() {
        return Err("clippy failed".into());
    }
    Ok(())
}

fn clean() -> Result<()> {
    let status = Command::new(cargo())
        .current_dir(workspace())
        .arg("clean")
        .status()?;
    if !status.success() {
        return Err("clean failed".into());
    }
    Ok(())
}

fn workspace() -> PathBuf {
    Path::new(&env!("CARGO_MANIFEST_DIR"))
        .ancestors()
        .nth(1)
        .unwrap()
        .to_path_buf()
}
