use std::process::Command;

fn main() {
	// Embed git commit hash, if we are building from a checkout
	let git_hash = Command::new("git")
		.args(["rev-parse", "--short", "HEAD"])
		.output()
		.ok()
		.and_then(|output| String::from_utf8(output.stdout).ok())
		.unwrap_or_default();
	println!("cargo:rustc-env=GIT_HASH={}", git_hash.trim());

	// Embed log directives if .cargo/log_directives exists
	println!("cargo:rerun-if-changed=.cargo/log_directives");
	if let Ok(directives) = std::fs::read_to_string(".cargo/log_directives") {
		let directives = directives.trim();
		if !directives.is_empty() {
			println!("cargo:rustc-env=LOG_DIRECTIVES={directives}");
		}
	}
}
