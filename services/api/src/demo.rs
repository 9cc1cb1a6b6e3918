use crate::infra::{load_directory, sample_seed};
use clap::Args;
use fabmarket::engagement::{
    BidSubmission, EngagementConfig, EngagementError, EngagementService, Identity,
    InMemoryDirectory, InMemoryEngagementStore, JobCategory, JobPosting, ProviderSearch,
    ResponseView, ReviewFeedQuery, ReviewSubmission,
};
use fabmarket::error::AppError;
use std::path::PathBuf;
use std::sync::Arc;

type DemoService = EngagementService<InMemoryEngagementStore, InMemoryDirectory>;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// JSON directory snapshot to use instead of the built-in sample providers.
    #[arg(long)]
    pub(crate) directory_seed: Option<PathBuf>,
    /// Customer user id posting the job.
    #[arg(long, default_value = "usr-casey")]
    pub(crate) customer: String,
    /// Provider user ids bidding on the job, in order. The first bid is accepted.
    #[arg(long = "provider", default_values_t = ["usr-avery".to_string(), "usr-bo".to_string()])]
    pub(crate) providers: Vec<String>,
    /// Stop after acceptance instead of completing and reviewing the job.
    #[arg(long)]
    pub(crate) skip_reviews: bool,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        directory_seed,
        customer,
        providers,
        skip_reviews,
    } = args;

    let directory = match directory_seed {
        Some(path) => load_directory(Some(&path))?,
        None => InMemoryDirectory::from_seed(sample_seed())?,
    };
    let service = EngagementService::new(
        Arc::new(InMemoryEngagementStore::new()),
        Arc::new(directory),
        EngagementConfig::default(),
    );
    let customer = Identity::customer(customer);
    let providers: Vec<Identity> = providers.into_iter().map(Identity::provider).collect();

    println!("Fabrication marketplace demo");
    if let Err(err) = walk_engagement(&service, &customer, &providers, skip_reviews) {
        println!("  Demo stopped: {} ({})", err, err.kind());
    }
    Ok(())
}

fn walk_engagement(
    service: &DemoService,
    customer: &Identity,
    providers: &[Identity],
    skip_reviews: bool,
) -> Result<(), EngagementError> {
    let job = service.post_job(
        Some(customer),
        JobPosting {
            title: "Bracket reprint".to_string(),
            description: "Reprint a cracked shelf bracket in PETG, three copies".to_string(),
            category: Some(JobCategory::ReplacementPart),
            materials: vec!["PETG".to_string()],
            budget_min: Some(25),
            budget_max: Some(80),
            deadline: None,
            city: None,
            image_urls: Vec::new(),
        },
    )?;
    println!(
        "\nPosted {} \"{}\" in {} [{}]",
        job.id,
        job.title,
        job.city,
        job.status
    );

    let mut bids = Vec::with_capacity(providers.len());
    for (offset, provider) in providers.iter().enumerate() {
        let price = 40 + 15 * offset as i64;
        match service.submit_response(
            Some(provider),
            &job.id,
            BidSubmission {
                message: format!("Can print this for ${price}"),
                estimated_price: Some(price),
                turnaround_days: Some(3),
            },
        ) {
            Ok(response) => {
                println!("  {} bid ${} as {}", provider.user_id, price, response.id);
                bids.push(response);
            }
            Err(err) => println!("  {} could not bid: {}", provider.user_id, err),
        }
    }

    let anonymous = service.job_detail(None, &job.id)?;
    println!("\nAnonymous view of the bids");
    render_responses(&anonymous.responses);

    let Some(winner) = bids.first() else {
        println!("\nNo bids landed; nothing to accept");
        return Ok(());
    };
    let outcome = service.accept_response(Some(customer), &job.id, &winner.id)?;
    println!(
        "\nAccepted {} from {}; {} other bid(s) declined [{}]",
        outcome.accepted.id,
        outcome.accepted.provider_user_id,
        outcome.declined,
        outcome.job.status
    );

    let owner_view = service.job_detail(Some(customer), &job.id)?;
    println!("Owner view of the bids");
    render_responses(&owner_view.responses);

    if skip_reviews {
        return Ok(());
    }

    let completed = service.complete_job(Some(customer), &job.id)?;
    println!("\nJob {} is now {}", completed.id, completed.status);

    let provider = providers
        .iter()
        .find(|identity| identity.user_id == winner.provider_user_id);
    for (reviewer, rating) in [(Some(customer), 5), (provider, 4)] {
        let Some(reviewer) = reviewer else { continue };
        let review = service.submit_review(
            Some(reviewer),
            ReviewSubmission {
                job_id: job.id.clone(),
                reviewee_id: None,
                rating,
                text: Some("Smooth handoff".to_string()),
            },
        )?;
        println!(
            "  {} reviewed {} with {} star(s)",
            review.reviewer_id, review.reviewee_id, review.rating
        );
    }

    let feed = service.review_feed(&ReviewFeedQuery {
        provider_slug: None,
        user_id: Some(winner.provider_user_id.clone()),
    })?;
    println!(
        "\nProvider rating: {:.1} across {} review(s)",
        feed.summary.avg_rating, feed.summary.count
    );

    println!("\nProvider directory (anonymous)");
    for listing in service.list_providers(None, &ProviderSearch::default())? {
        println!(
            "- {} ({}) {:.1} stars, contact {}",
            listing.display_name,
            listing.slug,
            listing.avg_rating,
            if listing.contact.is_some() { "shown" } else { "hidden" }
        );
    }
    Ok(())
}

fn render_responses(responses: &[ResponseView]) {
    for view in responses {
        let provider = view
            .provider
            .display_name
            .as_deref()
            .unwrap_or(view.provider.user_id.as_str());
        match &view.bid {
            Some(bid) => println!(
                "  {} [{}] {}: {}",
                view.id, view.status, provider, bid.message
            ),
            None => println!("  {} [{}] {}: (bid hidden)", view.id, view.status, provider),
        }
    }
}
