//! Blog commands.

use vitrine_core::PostId;
use vitrine_storefront::Storefront;

use super::CliError;

pub async fn list(app: &Storefront, page: u32) -> Result<(), CliError> {
    app.blog().load_posts(page).await?;
    let state = app.blog().snapshot();
    for post in &state.posts {
        let date = post
            .published_at
            .map_or_else(|| "draft".to_string(), |at| at.format("%Y-%m-%d").to_string());
        println!("{date}  {}  ({})", post.title, post.slug);
    }
    println!("page {} of {}", state.page, state.page_count().max(1));
    Ok(())
}

pub async fn show(app: &Storefront, slug: &str) -> Result<(), CliError> {
    let post = app.blog().load_post(slug).await?;
    println!("{}", post.title);
    if let Some(author) = &post.author {
        println!("by {author}");
    }
    println!();
    println!("{}", post.body);
    Ok(())
}

pub async fn delete(app: &Storefront, id: PostId) -> Result<(), CliError> {
    app.blog().delete_post(id).await?;
    println!("Deleted post {id}");
    Ok(())
}
