fn main() {
    ftqueue::app::startup::startup();
}
