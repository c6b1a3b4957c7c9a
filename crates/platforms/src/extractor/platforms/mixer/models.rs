use serde::Deserialize;

/// `GET /api/v1/channels/{name}` response body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MixerChannel {
    #[serde(default)]
    pub online: bool,
    /// Channel slug used in URLs.
    #[serde(default)]
    pub token: Option<String>,
    /// The broadcast title.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub num_followers: Option<u64>,
    #[serde(default)]
    pub viewers_total: Option<u64>,
    #[serde(default)]
    pub user: Option<MixerUser>,
    #[serde(default)]
    pub thumbnail: Option<MixerResource>,
    #[serde(default, rename = "type")]
    pub game: Option<MixerGame>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MixerUser {
    pub username: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MixerResource {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct MixerGame {
    pub name: String,
}
