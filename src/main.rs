fn main() {
    duetick_lib::run()
}
