fn main() {
    if let Err(e) = roadmap_blog_lib::run() {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
