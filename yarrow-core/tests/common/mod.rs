use yarrow_core::{Yaml, YamlData};

/// Loads `input` and checks the dump gives the same bytes back.
pub fn assert_round_trip(input: &str) {
    let mut yaml = Yaml::new();
    let data = yaml.load(input).unwrap();
    assert_eq!(yaml.dump(&data).unwrap(), input, "input was {input:?}");
}

pub fn load(input: &str) -> YamlData {
    Yaml::new().load(input).unwrap()
}

pub fn dump(data: &YamlData) -> String {
    Yaml::new().dump(data).unwrap()
}
