use moonscape::{config::SceneConfig, flow};

fn main() -> anyhow::Result<()> {
    flow::run(SceneConfig::from_env())
}
