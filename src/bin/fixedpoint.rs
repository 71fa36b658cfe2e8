//! Command-line entry point; see [`fixedpoint::cli`].

fn main() {
    fixedpoint::cli::run();
}
