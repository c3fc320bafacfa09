use chrono::{DateTime, Duration, Utc};

use recall_backend::srs::CardState;
use recall_backend::store::operations::cards::Card;
use recall_backend::store::operations::hierarchy::{Subject, Topic};
use recall_backend::store::Store;

pub fn seed_subject(store: &Store, user_id: &str, subject_id: &str) -> Subject {
    let subject = Subject {
        id: subject_id.to_string(),
        user_id: user_id.to_string(),
        title: format!("Subject {subject_id}"),
        created_at: Utc::now(),
    };
    store.create_subject(&subject).expect("seed subject");
    subject
}

pub fn seed_topic(store: &Store, subject_id: &str, topic_id: &str) -> Topic {
    let topic = Topic {
        id: topic_id.to_string(),
        subject_id: subject_id.to_string(),
        title: format!("Topic {topic_id}"),
        created_at: Utc::now(),
    };
    store.create_topic(&topic).expect("seed topic");
    topic
}

pub fn seed_new_card(store: &Store, topic: &Topic, card_id: &str, created_at: DateTime<Utc>) -> Card {
    let card = Card::new(card_id, &topic.id, &topic.subject_id, "front", "back", created_at);
    store.create_card(&card).expect("seed card");
    card
}

/// A card already in REVIEW, scheduled for `next_review`.
pub fn seed_review_card(
    store: &Store,
    topic: &Topic,
    card_id: &str,
    stability: f64,
    next_review: DateTime<Utc>,
) -> Card {
    let mut card = Card::new(
        card_id,
        &topic.id,
        &topic.subject_id,
        "front",
        "back",
        next_review - Duration::days(30),
    );
    card.state = CardState::Review;
    card.stability = stability;
    card.difficulty = 5.0;
    card.reps = 3;
    card.next_review = next_review;
    store.create_card(&card).expect("seed review card");
    card
}
