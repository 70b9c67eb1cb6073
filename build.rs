fn main() {
    // cfg.toml が無い場合は toml-cfg のデフォルト値でビルドする
    if !std::path::Path::new("cfg.toml").exists() {
        println!(
            "cargo:warning=cfg.toml not found, building with default settings. Use `cfg.toml.example` as a template."
        );
    }
    println!("cargo:rerun-if-changed=cfg.toml");

    // ESP-IDF 向けビルドの場合のみ ESP-IDF のビルド環境を出力する
    if std::env::var("CARGO_CFG_TARGET_OS").as_deref() == Ok("espidf") {
        embuild::espidf::sysenv::output();
    }
}
