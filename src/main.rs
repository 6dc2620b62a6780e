fn main() {
    opcheck::cli::run();
}
