//! Basic example demonstrating the codeBeamer API client.
//!
//! Run with:
//! ```
//! CODEBEAMER_URL=https://cb.example.com CODEBEAMER_USERNAME=bond \
//!     CODEBEAMER_PASSWORD=007 cargo run --example basic
//! ```

use cbapi::Codebeamer;

#[tokio::main]
async fn main() -> cbapi::Result<()> {
    // Initialize tracing for debugging (optional)
    tracing_subscriber::fmt::init();

    // Create client from environment variables
    println!("Creating codeBeamer client...");
    let cb = Codebeamer::from_env()?;
    println!("Connected to: {}", cb.client().base_url());

    // List projects (references only, no detail requests yet)
    println!("\n--- Listing Projects ---");
    let projects = cb.get_projects().await?;
    println!("Found {} projects", projects.len());

    for project in &projects {
        println!("  - {} ({})", project.name(), project.id());
    }

    // Load the first project and walk its trackers
    if let Some(project) = projects.first() {
        println!("\n--- Project Details ---");
        let detail = project.detail().await?;
        println!("Project: {}", project.name());
        println!("  Key: {}", detail.key_name.as_deref().unwrap_or("-"));
        println!("  Created: {:?}", detail.created_at);

        println!("\n--- Trackers ---");
        let trackers = project.get_trackers().await?;
        for tracker in trackers.iter().take(5) {
            println!("  - {} ({})", tracker.name(), tracker.id());
        }

        // First page of items of the first tracker
        if let Some(tracker) = trackers.first() {
            println!("\n--- Items of {} (first page) ---", tracker.name());
            for item in tracker.get_items(1, 10).await? {
                let status = match item.status().await? {
                    Some(status) => status.value().to_string(),
                    None => "-".to_string(),
                };
                println!("  - #{} {} [{}]", item.id(), item.name(), status);
            }
        }
    }

    Ok(())
}
