// tests/session_flow.rs
//
// End-to-end conversations against in-memory resources (no filesystem),
// with the language model either disabled or backed by canned replies.

use std::sync::Arc;

use moviebot::ai::{AiClient, DisabledClient, Emotion, LlmClient, MockProvider, Task};
use moviebot::catalog::Catalog;
use moviebot::engine::{BotSettings, FollowUp, MovieBot, Resources, TurnOutcome};
use moviebot::lexicon::{Label, SentimentLexicon};
use moviebot::ratings::RatingsMatrix;
use moviebot::session::Mode;

fn resources() -> Resources {
    let catalog = Catalog::from_titles([
        "Matrix, The (1999)",
        "Blade Runner (1982)",
        "Alien (1979)",
        "Notebook, The (2004)",
        "Titanic (1997)",
        "Heat (1995)",
        "Fargo (1996)",
        "Wings of Desire (Himmel über Berlin, Der) (1987)",
        "Jaws (1975)",
        "Clue (1985)",
        "Seven (a.k.a. Se7en) (1995)",
        "Braveheart (1995)",
    ]);
    let lexicon = SentimentLexicon::from_pairs([
        ("love", Label::Pos),
        ("like", Label::Pos),
        ("great", Label::Pos),
        ("hate", Label::Neg),
        ("awful", Label::Neg),
    ]);
    // 12 movies x 6 users, raw 0..5
    let raw = RatingsMatrix::from_rows(vec![
        vec![5.0, 4.0, 0.0, 1.0, 4.5, 0.0],
        vec![4.0, 5.0, 0.0, 2.0, 4.0, 1.0],
        vec![4.5, 3.5, 1.0, 0.0, 5.0, 0.0],
        vec![1.0, 0.0, 5.0, 4.0, 0.0, 4.5],
        vec![0.0, 1.5, 4.5, 5.0, 1.0, 4.0],
        vec![3.0, 4.0, 2.0, 0.0, 3.5, 0.0],
        vec![3.5, 0.0, 0.0, 3.0, 4.0, 2.0],
        vec![0.0, 0.0, 4.0, 0.0, 0.0, 5.0],
        vec![4.0, 4.0, 0.0, 1.0, 5.0, 0.0],
        vec![0.0, 3.0, 3.0, 3.0, 0.0, 0.0],
        vec![5.0, 4.5, 0.5, 0.0, 4.0, 1.0],
        vec![2.0, 0.0, 4.0, 4.5, 0.0, 3.0],
    ])
    .expect("rectangular");
    Resources::from_raw(catalog, lexicon, &raw, 2.5).expect("shapes agree")
}

fn bot_with(ai: Arc<dyn AiClient>, llm_programming: bool) -> MovieBot {
    MovieBot::new(
        resources(),
        BotSettings {
            k: 4,
            llm_programming,
        },
        ai,
    )
}

#[tokio::test]
async fn five_non_neutral_turns_switch_to_recommending_on_the_fifth() {
    let bot = bot_with(Arc::new(DisabledClient), false);
    let mut s = bot.new_session();

    let turns = [
        ("I loved \"The Matrix\"", 0usize),
        ("I hated \"The Notebook\"", 3),
        ("\"Blade Runner\" was great", 1),
        ("I did not like \"Titanic\"", 4),
        ("I like \"Alien\"", 2),
    ];
    for (n, (line, index)) in turns.iter().enumerate() {
        let r = bot.process(&mut s, line).await;
        match &r.outcome {
            TurnOutcome::Rated { index: got, .. } => assert_eq!(got, index, "{line}"),
            other => panic!("{line}: unexpected {other:?}"),
        }
        let expected = if n < 4 { Mode::Collecting } else { Mode::Recommending };
        assert_eq!(r.mode, expected, "after turn {}", n + 1);
    }

    let recs = s.recommendations().to_vec();
    assert!(!recs.is_empty());
    assert!(recs.len() <= 4);
    for rated in [0, 1, 2, 3, 4] {
        assert!(!recs.contains(&rated), "rated movie {rated} recommended");
    }
    assert_eq!(&s.user_ratings()[..5], &[1, 1, 1, -1, -1]);
}

#[tokio::test]
async fn neutral_turn_at_threshold_does_not_recommend() {
    let bot = bot_with(Arc::new(DisabledClient), false);
    let mut s = bot.new_session();
    for line in [
        "I loved \"The Matrix\"",
        "I loved \"Heat\"",
        "I loved \"Fargo\"",
        "I loved \"Jaws\"",
    ] {
        bot.process(&mut s, line).await;
    }
    let r = bot.process(&mut s, "I saw \"Clue\" yesterday").await;
    assert_eq!(r.tag, "neutral");
    assert_eq!(r.mode, Mode::Collecting);
    assert_eq!(r.num_rated, 4);

    let r = bot.process(&mut s, "\"Clue\" was awful").await;
    assert_eq!(r.mode, Mode::Recommending);
}

#[tokio::test]
async fn foreign_title_resolves_through_translation() {
    let mock = MockProvider::default()
        .with(Task::DetectLanguage, "1")
        .with(Task::TranslateTitle, "Wings of Desire (1987)");
    let ai = Arc::new(LlmClient::new(mock, 50));
    let bot = bot_with(ai.clone(), false);
    let mut s = bot.new_session();

    let r = bot
        .process(&mut s, "I loved \"Der Himmel über Berlin (1987)\"")
        .await;
    assert_eq!(r.tag, "positive");
    match r.outcome {
        TurnOutcome::Rated {
            index, follow_up, ..
        } => {
            assert_eq!(index, 7);
            assert_eq!(follow_up, FollowUp::KeepRating { remaining: 4 });
        }
        other => panic!("unexpected {other:?}"),
    }
    // one language check, one translation
    assert_eq!(ai.provider().call_count(), 2);
}

#[tokio::test]
async fn llm_programming_adds_emotions_and_filters_off_topic() {
    let mock = MockProvider::default()
        .with(Task::OffTopic, "1")
        .with(Task::Emotions, r#"{"emotions": ["anger"]}"#);
    let bot = bot_with(Arc::new(LlmClient::new(mock, 50)), true);
    let mut s = bot.new_session();

    let r = bot.process(&mut s, "I am so angry about taxes").await;
    assert_eq!(r.tag, "off-topic");
    assert_eq!(r.emotions, vec![Emotion::Anger]);
    assert_eq!(s.num_rated(), 0);
}

#[tokio::test]
async fn llm_programming_degrades_when_model_is_silent() {
    let bot = bot_with(Arc::new(DisabledClient), true);
    let mut s = bot.new_session();
    let r = bot.process(&mut s, "I loved \"Heat\"").await;
    assert_eq!(r.tag, "positive");
    assert!(r.emotions.is_empty());
}

#[tokio::test]
async fn snapshot_lists_ratings_and_pending_recommendations() {
    let bot = bot_with(Arc::new(DisabledClient), false);
    let mut s = bot.new_session();
    for line in [
        "I loved \"The Matrix\"",
        "I loved \"Blade Runner\"",
        "I loved \"Alien\"",
        "I hated \"The Notebook\"",
        "I hated \"Titanic\"",
    ] {
        bot.process(&mut s, line).await;
    }

    let snap = bot.snapshot(&s);
    assert_eq!(snap.mode, Mode::Recommending);
    assert_eq!(snap.num_rated, 5);
    assert_eq!(snap.rated[0].title, "Matrix, The (1999)");
    assert_eq!(snap.rated[3].rating, -1);
    assert_eq!(snap.cursor, 1);
    assert_eq!(snap.pending.len(), s.recommendations().len() - 1);
}
