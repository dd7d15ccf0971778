use super::*;

#[test]
fn cites_first_source() {
    let messages = vec![
        ChatMessage::system("Answer with sources."),
        ChatMessage::user(
            "Content: The sky is blue.\nSource: 1-1\n\nContent: Grass is green.\nSource: 2-1\n\nQUESTION: What colour is the sky?",
        ),
    ];

    let reply = FakeChat.complete(&messages).expect("fake chat never fails");
    assert_eq!(reply, "The sky is blue.\nSOURCES: 1-1");
    assert_eq!(FakeChat.model(), "debug");
}

#[test]
fn no_context_means_no_sources() {
    let reply = FakeChat
        .complete(&[ChatMessage::user("Hello?")])
        .expect("fake chat never fails");
    assert_eq!(reply, "I don't know.\nSOURCES:");
}

#[test]
fn long_content_is_shortened() {
    let long = "word ".repeat(100);
    let prompt = format!("Content: {}\nSource: 3-2", long);
    let reply = FakeChat
        .complete(&[ChatMessage::user(prompt)])
        .expect("fake chat never fails");

    let (answer, sources) = reply.split_once("\nSOURCES: ").expect("reply has sources");
    assert!(answer.chars().count() <= 200);
    assert_eq!(sources, "3-2");
}
