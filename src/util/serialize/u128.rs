use {
    serde::{de, Deserialize, Deserializer, Serializer},
    serde_with::{DeserializeAs, SerializeAs},
    std::borrow::Cow,
};

/// Serialize and deserialize `u128` token amounts as decimal strings, which is
/// how they travel in JSON payloads.
#[derive(Debug)]
pub struct U128;

impl<'de> DeserializeAs<'de, u128> for U128 {
    fn deserialize_as<D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        let s = Cow::<str>::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

impl SerializeAs<u128> for U128 {
    fn serialize_as<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }
}
