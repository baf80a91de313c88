//! HTML pages, rendered with minijinja.
//!
//! Templates live under `templates/` and are compiled into the binary. Names
//! end in `.html`, which turns on minijinja's HTML auto-escaping.

use crate::posts;
use minijinja::Environment;
use serde::Serialize;

const TEMPLATES: &[(&str, &str)] = &[
    ("base.html", include_str!("../templates/base.html")),
    ("index.html", include_str!("../templates/index.html")),
    ("blog.html", include_str!("../templates/blog.html")),
    ("admin_login.html", include_str!("../templates/admin_login.html")),
    ("admin.html", include_str!("../templates/admin.html")),
    ("about.html", include_str!("../templates/about.html")),
    ("resources.html", include_str!("../templates/resources.html")),
];

pub struct Views {
    env: Environment<'static>,
}

impl Views {
    pub fn new() -> Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        for &(name, source) in TEMPLATES {
            env.add_template(name, source)?;
        }
        env.add_filter("tags", |content: String| posts::extract_tags(&content));
        Ok(Views { env })
    }

    pub fn render<S: Serialize>(&self, name: &str, ctx: S) -> Result<String, minijinja::Error> {
        self.env.get_template(name)?.render(ctx)
    }
}
