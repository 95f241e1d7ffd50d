fn main() {
    famsync_lib::run()
}
