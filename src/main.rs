fn main() {
    cubelauncher_lib::run()
}
