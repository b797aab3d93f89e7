fn main() {
    station_replace::cli::run();
}
