//! Descriptors for the vendors shipped with the server.

use crate::types::PluginDescriptor;

/// Built-in vendor names, in the order they are registered.
pub const BUILTIN_NAMES: [&str; 5] = ["wpilib", "rev", "ctre", "redux", "photonvision"];

/// All built-in descriptors, in registration order.
pub fn builtin() -> Vec<PluginDescriptor> {
    BUILTIN_NAMES.iter().filter_map(|name| descriptor(name)).collect()
}

/// Descriptor of the built-in vendor `name`, if there is one.
pub fn descriptor(name: &str) -> Option<PluginDescriptor> {
    let (display_name, description, versions, languages, base_urls): (
        &str,
        &str,
        &[&str],
        &[&str],
        &[&str],
    ) = match name {
        "wpilib" => (
            "WPILib",
            "Official WPILib documentation for FRC robot programming",
            &["2025", "2024", "2023"],
            &["Java", "Python", "C++"],
            &[
                "https://docs.wpilib.org",
                "https://first.wpi.edu",
                "http://docs.wpilib.org",
            ],
        ),
        "rev" => (
            "REV Robotics",
            "REV Robotics documentation for SparkMax, SparkFlex, and related hardware",
            &["2025", "2024"],
            &["Java", "C++"],
            &[
                "https://docs.revrobotics.com",
                "https://revrobotics.com/docs",
                "http://docs.revrobotics.com",
            ],
        ),
        "ctre" => (
            "CTRE Phoenix 6",
            "CTR Electronics Phoenix 6 documentation for TalonFX, CANcoder, Pigeon 2, and CANivore",
            &["2025", "stable"],
            &["Java", "C++", "Python"],
            &["https://v6.docs.ctr-electronics.com", "http://v6.docs.ctr-electronics.com"],
        ),
        "redux" => (
            "Redux Robotics",
            "Redux Robotics documentation for Canandmag, Canandgyro, and ReduxLib",
            &["2025"],
            &["Java", "C++"],
            &["https://docs.reduxrobotics.com", "http://docs.reduxrobotics.com"],
        ),
        "photonvision" => (
            "PhotonVision",
            "PhotonVision documentation for vision processing and PhotonLib",
            &["2025"],
            &["Java", "Python", "C++"],
            &["https://docs.photonvision.org", "http://docs.photonvision.org"],
        ),
        _ => return None,
    };

    let owned = |items: &[&str]| -> Vec<String> { items.iter().map(|s| (*s).to_string()).collect() };
    Some(PluginDescriptor {
        name: name.to_string(),
        display_name: display_name.to_string(),
        description: description.to_string(),
        supported_versions: owned(versions),
        supported_languages: owned(languages),
        base_urls: owned(base_urls),
    })
}
