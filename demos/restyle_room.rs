use std::path::PathBuf;

use inspacio::pipeline::display_names;
use inspacio::{Client, Pipeline, RestyleRequest, Selection};

#[tokio::main]
async fn main() -> inspacio::Result<()> {
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let Some(room_path) = args.next().map(PathBuf::from) else {
        eprintln!("usage: restyle_room <room-image> [object-name] [style text]");
        std::process::exit(2);
    };
    let object = args.next();
    let style = args.next().unwrap_or_else(|| "modern walnut texture".to_string());

    let client = Client::from_env()?;
    let mut pipeline = Pipeline::new(client);
    pipeline.set_image(std::fs::read(&room_path)?);

    let names = display_names(pipeline.analyze().await?);
    if let Some(warning) = pipeline.detection_warning() {
        eprintln!("{warning}");
    } else {
        println!("detected: {}", names.join(", "));
    }

    let selection = match object {
        Some(name) => Selection::Object(name),
        None => Selection::WholeRoom,
    };
    let outcome = pipeline
        .restyle(&RestyleRequest::with_text_style(selection, style))
        .await?;

    println!("prompt: {}", outcome.prompt);
    std::fs::write("restyled.png", &outcome.primary)?;
    println!("saved restyled.png");

    for (index, slot) in outcome.suggestions.iter().enumerate() {
        match &slot.image {
            Some(image) => {
                let filename = format!("suggestion_{index}.png");
                std::fs::write(&filename, image)?;
                println!("suggestion '{}' saved to {filename}", slot.label);
            }
            None => eprintln!(
                "suggestion '{}' failed: {}",
                slot.label,
                slot.error.as_deref().unwrap_or("unknown")
            ),
        }
    }

    Ok(())
}
