fn main() {
    // ESP-IDF environment propagation is only needed for the firmware image;
    // host builds (tests, simulation) skip it entirely.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
