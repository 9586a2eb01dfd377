fn main() {
    // Emit the ESP-IDF sysenv only when cross-compiling for an espidf target
    // (covers both xtensa and riscv chips). Build scripts run on the host.
    if let Ok(target) = std::env::var("TARGET") {
        if target.contains("espidf") {
            embuild::espidf::sysenv::output();
        }
    }
}
