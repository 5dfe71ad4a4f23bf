//! callpath CLI — out of scope for this crate (§6 "external collaborators");
//! storage, data loading, and run dispatch live outside `callpath-core` and
//! `callpath-runner`. Kept as a stub binary so the workspace has a runnable
//! target.

fn main() {
    println!("callpath-cli — not yet implemented");
}
