use log4rs::config::Deserializers;

mod default_pattern;

/// Gets the deserializers for the log config, including the custom kinds.
pub fn deserializers() -> Deserializers {
    let mut d = Deserializers::new();
    d.insert("default", default_pattern::DefaultPatternDeserializer);
    d
}
