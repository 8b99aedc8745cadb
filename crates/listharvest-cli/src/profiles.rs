use listharvest_scraper::EndpointProfile;

/// Prints the built-in profiles, marking the one currently configured.
pub(crate) fn print_profiles(configured: &str) {
    let configured = EndpointProfile::by_name(configured).map(|p| p.name);
    for profile in EndpointProfile::builtin() {
        let marker = if configured.as_deref() == Some(profile.name.as_str()) {
            "*"
        } else {
            " "
        };
        println!(
            "{marker} {:<14} first page {}  results at {}  {}",
            profile.name,
            profile.start_page,
            profile.results_path_display(),
            profile.base_url
        );
    }
}
