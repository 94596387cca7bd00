//! Static source catalog for reading and podcast feeds.
//!
//! The catalog is an ordered, immutable list of sources per content type.
//! Declaration order doubles as the fallback traversal order, which keeps
//! the cascade deterministic and reproducible in tests.
//!
//! # Sources
//!
//! | Source | Kind | Region | Feed |
//! |--------|------|--------|------|
//! | 20minutos | article | España | RSS portada |
//! | El País | article | España | MRSS portada |
//! | El País Opinión | article | España | MRSS opinión |
//! | El Mundo | article | España | RSS portada |
//! | ABC | article | España | RSS España |
//! | Hoy Hablamos | podcast | España | site feed |
//! | Radio Ambulante | podcast | Latinoamérica | NPR feed |
//! | SpanishPodcast | podcast | España | FeedBurner |
//! | Spanish with Vicente | podcast | España | FeedBurner |
//! | DELE Podcast | podcast | España | Anchor feed |

use crate::models::{ContentKind, Source};

const ARTICLE_SOURCES: [Source; 5] = [
    Source {
        id: "veinteminutos",
        name: "20minutos",
        kind: ContentKind::Article,
        priority_rank: 1,
        feed_endpoint: "https://www.20minutos.es/rss/",
        region: "España",
        base_link_template: "https://www.20minutos.es/",
    },
    Source {
        id: "elpais-portada",
        name: "El País",
        kind: ContentKind::Article,
        priority_rank: 2,
        feed_endpoint: "https://feeds.elpais.com/mrss-s/pages/ep/site/elpais.com/portada",
        region: "España",
        base_link_template: "https://elpais.com/",
    },
    Source {
        id: "elpais-opinion",
        name: "El País Opinión",
        kind: ContentKind::Article,
        priority_rank: 3,
        feed_endpoint: "https://feeds.elpais.com/mrss-s/pages/ep/site/elpais.com/section/opinion",
        region: "España",
        base_link_template: "https://elpais.com/opinion/",
    },
    Source {
        id: "elmundo",
        name: "El Mundo",
        kind: ContentKind::Article,
        priority_rank: 4,
        feed_endpoint: "https://e00-elmundo.uecdn.es/elmundo/rss/portada.xml",
        region: "España",
        base_link_template: "https://www.elmundo.es/",
    },
    Source {
        id: "abc",
        name: "ABC",
        kind: ContentKind::Article,
        priority_rank: 5,
        feed_endpoint: "https://www.abc.es/rss/feeds/abc_EspanaEspana.xml",
        region: "España",
        base_link_template: "https://www.abc.es/",
    },
];

const PODCAST_SOURCES: [Source; 5] = [
    Source {
        id: "hoy-hablamos",
        name: "Hoy Hablamos",
        kind: ContentKind::Podcast,
        priority_rank: 1,
        feed_endpoint: "https://www.hoyhablamos.com/feed/podcast/",
        region: "España",
        base_link_template: "https://podcasts.apple.com/es/podcast/hoy-hablamos/id1455031513",
    },
    Source {
        id: "radio-ambulante",
        name: "Radio Ambulante",
        kind: ContentKind::Podcast,
        priority_rank: 2,
        feed_endpoint: "https://feeds.npr.org/510311/podcast.xml",
        region: "Latinoamérica",
        base_link_template: "https://podcasts.apple.com/us/podcast/radio-ambulante/id527614348",
    },
    Source {
        id: "spanishpodcast",
        name: "SpanishPodcast",
        kind: ContentKind::Podcast,
        priority_rank: 3,
        feed_endpoint: "https://feeds.feedburner.com/SpanishPodcast",
        region: "España",
        base_link_template: "https://podcasts.apple.com/us/podcast/spanishpodcast/id70077665",
    },
    Source {
        id: "spanish-with-vicente",
        name: "Spanish with Vicente",
        kind: ContentKind::Podcast,
        priority_rank: 4,
        feed_endpoint: "https://feeds.feedburner.com/SpanishWithVicente",
        region: "España",
        base_link_template: "https://podcasts.apple.com/us/podcast/spanish-with-vicente/id1493547273",
    },
    Source {
        id: "dele-podcast",
        name: "DELE Podcast",
        kind: ContentKind::Podcast,
        priority_rank: 5,
        feed_endpoint: "https://anchor.fm/s/f4f4a4f0/podcast/rss",
        region: "España",
        base_link_template: "https://podcasts.apple.com/us/podcast/examen-dele/id1705001626",
    },
];

/// All sources of the given kind, in stable catalog order.
pub fn list_sources(kind: ContentKind) -> &'static [Source] {
    match kind {
        ContentKind::Article => &ARTICLE_SOURCES,
        ContentKind::Podcast => &PODCAST_SOURCES,
    }
}

/// All sources of the given kind except `exclude_id`, preserving catalog
/// order. This is the fallback list for the cascade: the current source is
/// always excluded from its own alternatives.
pub fn alternatives(kind: ContentKind, exclude_id: &str) -> Vec<&'static Source> {
    list_sources(kind)
        .iter()
        .filter(|s| s.id != exclude_id)
        .collect()
}

/// Look up a source by id across both kinds.
pub fn find(id: &str) -> Option<&'static Source> {
    ARTICLE_SOURCES
        .iter()
        .chain(PODCAST_SOURCES.iter())
        .find(|s| s.id == id)
}
