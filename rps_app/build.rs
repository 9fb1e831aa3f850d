use std::process::Command;

fn main() {
    println!("cargo::rerun-if-changed=Cargo.toml");
    include_git_commit_hash();
}

/// Sets `GIT_HASH` for the crate compilation. Prints a warning if git is
/// unavailable, in which case the hash is reported as unknown at runtime.
fn include_git_commit_hash() {
    let output = match Command::new("git").args(["rev-parse", "--short", "HEAD"]).output() {
        Ok(output) if output.status.success() => output,
        Ok(_) => {
            println!("cargo::warning=`git rev-parse` exited with non-success error code");
            return;
        },
        Err(why) => {
            println!("cargo::warning=cannot find git commit hash: {why}");
            return;
        },
    };

    match String::from_utf8(output.stdout) {
        Ok(hash) => println!("cargo::rustc-env=GIT_HASH={}", hash.trim()),
        Err(_) => println!("cargo::warning=`git rev-parse` output is invalid utf-8"),
    }
}
