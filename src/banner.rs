//! Startup banner for `oldnew serve`.

use crate::config::Settings;
use crate::consts::{AUTHOR, HOMEPAGE, REPO};

/// Everything the banner shows, borrowed from the running configuration.
pub struct BannerInfo<'a> {
    pub settings: &'a Settings,
    /// Where the token currently resolves from, if anywhere.
    pub token_source: Option<&'a str>,
}

pub fn render_banner(info: &BannerInfo) -> String {
    let s = info.settings;
    format!(
        r#"
   ╔═══════════════════════════════════════╗
   ║             o l d . n e w             ║
   ║     treasured memories, restored      ║
   ╚═══════════════════════════════════════╝

   version   {}
   by        {}
   home      {}
   repo      {}
   listen    http://{}
   provider  {}
   model     {}
   token     {}
   polling   every {:?}, up to {} checks within {:?}
"#,
        env!("CARGO_PKG_VERSION"),
        AUTHOR,
        HOMEPAGE,
        REPO,
        s.bind,
        s.provider_url,
        short_version(&s.model_version),
        info.token_source.unwrap_or("not configured"),
        s.poll.interval,
        s.poll.max_polls,
        s.poll.deadline,
    )
}

pub fn print_banner(info: &BannerInfo) {
    println!("{}", render_banner(info));
}

/// Version hashes are long; the first 12 characters identify them well enough.
fn short_version(version: &str) -> &str {
    version.get(..12).unwrap_or(version)
}
