use serde::Deserialize;

/// `GET /kraken/streams/{id}` response body.
#[derive(Debug, Deserialize)]
pub struct StreamResponse {
    pub stream: Option<TwitchStream>,
}

#[derive(Debug, Deserialize)]
pub struct TwitchStream {
    #[serde(default)]
    pub preview: Option<Preview>,
    pub channel: TwitchChannel,
}

#[derive(Debug, Deserialize)]
pub struct Preview {
    #[serde(default)]
    pub medium: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TwitchChannel {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub logo: Option<String>,
    /// The broadcast title.
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub game: Option<String>,
    #[serde(default)]
    pub followers: Option<u64>,
    #[serde(default)]
    pub views: Option<u64>,
}

/// `GET /kraken/users?login=...` response body.
#[derive(Debug, Deserialize)]
pub struct UsersResponse {
    #[serde(default)]
    pub users: Vec<TwitchUser>,
}

#[derive(Debug, Deserialize)]
pub struct TwitchUser {
    #[serde(rename = "_id", deserialize_with = "id_as_string")]
    pub id: String,
    pub name: String,
}

/// Kraken returns ids as strings on some endpoints and numbers on others.
fn id_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(u64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Number(n) => n.to_string(),
    })
}
