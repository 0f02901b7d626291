use schemars::JsonSchema;
use serde::Deserialize;

use crate::types::TrackMetadata;

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct ListDirectoryParams {
    #[schemars(description = "Page number to retrieve, starting at 1 (default 1)")]
    pub page: Option<u32>,
    #[schemars(description = "Entries per page (default 100)")]
    pub page_size: Option<u32>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SearchFilesParams {
    #[schemars(
        description = "Case-insensitive regex or substring matched against file names (e.g. 'mp3', 'lrc', 'm3u')"
    )]
    pub pattern: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GenerateOrAppendPlaylistParams {
    #[schemars(description = "Tracks to append, in playback order (as returned by get_metadata)")]
    #[serde(alias = "playlist_metadata_list")]
    pub entries: Vec<TrackMetadata>,
    #[schemars(
        description = "Playlist file name including the .m3u extension, e.g. 'road-trip.m3u'. Created under <root>/Playlist."
    )]
    pub playlist_name: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct RemoveFromPlaylistParams {
    #[schemars(description = "Path of the playlist file to edit")]
    pub path: String,
    #[schemars(description = "Paths of the songs to remove")]
    pub songs_to_remove: Vec<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct PathParams {
    #[schemars(description = "Absolute path inside the library root")]
    pub path: String,
}
