use std::collections::BTreeSet;

use akonadi_proto::{
    ChangeNotification, Collection, CollectionId, Command, CommandEnvelope, CommandKind,
    EntityRef, EntityType, ErrorCode, FetchDepth, ItemChanges, ListFilter, LoginKind, Operation,
    PROTOCOL_VERSION, ProtocolError, Response, ResponseEnvelope, Scope, SessionId, Tag,
};

#[test]
fn command_envelope_roundtrip_cbor() {
    let login = CommandEnvelope {
        tag: Tag(1),
        body: Command::Login {
            session: SessionId::from("kmail-12"),
            kind: LoginKind::NotificationBus,
        },
    };

    let encoded = serde_cbor::to_vec(&login).expect("command encode should succeed");
    let decoded: CommandEnvelope<Command> =
        serde_cbor::from_slice(&encoded).expect("command decode should succeed");
    assert_eq!(decoded, login);

    let fetch = CommandEnvelope {
        tag: Tag(2),
        body: Command::FetchCollections {
            scope: Scope::Rid(vec!["INBOX".to_string()]),
            depth: FetchDepth::Recursive,
            resource: Some("akonadi_imap_resource_0".to_string()),
            mime_types: vec!["message/rfc822".to_string()],
            list_filter: ListFilter::Display,
            fetch_stats: true,
        },
    };

    let encoded = serde_cbor::to_vec(&fetch).expect("command encode should succeed");
    let decoded: CommandEnvelope<Command> =
        serde_cbor::from_slice(&encoded).expect("command decode should succeed");
    assert_eq!(decoded, fetch);
    assert_eq!(decoded.body.kind(), CommandKind::FetchCollections);
}

#[test]
fn response_envelope_roundtrip_cbor() {
    let hello = ResponseEnvelope {
        tag: Tag::UNSOLICITED,
        body: Response::Hello {
            server: "Akonadi".to_string(),
            message: "Not Really IMAP server".to_string(),
            protocol: PROTOCOL_VERSION,
        },
    };

    let encoded = serde_cbor::to_vec(&hello).expect("response encode should succeed");
    let decoded: ResponseEnvelope<Response> =
        serde_cbor::from_slice(&encoded).expect("response decode should succeed");
    assert_eq!(decoded, hello);

    let listing_end = ResponseEnvelope {
        tag: Tag(9),
        body: Response::FetchCollections {
            collection: Some(Collection::new(4)),
        },
    };
    let encoded = serde_cbor::to_vec(&listing_end).expect("response encode should succeed");
    let decoded: ResponseEnvelope<Response> =
        serde_cbor::from_slice(&encoded).expect("response decode should succeed");
    assert_eq!(decoded, listing_end);
}

#[test]
fn error_response_reports_answered_kind() {
    let error = Response::Error {
        kind: CommandKind::FetchCollectionStats,
        error: ProtocolError::new(ErrorCode::NotFound, "no such collection"),
    };

    assert!(error.is_error());
    assert_eq!(error.kind(), CommandKind::FetchCollectionStats);

    let encoded = serde_cbor::to_vec(&error).expect("error encode should succeed");
    let decoded: Response = serde_cbor::from_slice(&encoded).expect("error decode should succeed");
    assert_eq!(decoded, error);
}

#[test]
fn change_notification_survives_the_wire() {
    let mut notification = ChangeNotification::new(
        SessionId::from("korganizer"),
        EntityType::Items,
        Operation::ModifyFlags,
        vec![EntityRef::new(10), EntityRef::new(11)],
    );
    notification.parent_collection = Some(CollectionId(3));
    notification.added_flags = BTreeSet::from(["\\SEEN".to_string()]);

    let envelope = ResponseEnvelope {
        tag: Tag::UNSOLICITED,
        body: Response::ChangeNotification {
            notification: notification.clone(),
        },
    };

    let encoded = serde_cbor::to_vec(&envelope).expect("notification encode should succeed");
    let decoded: ResponseEnvelope<Response> =
        serde_cbor::from_slice(&encoded).expect("notification decode should succeed");

    match decoded.body {
        Response::ChangeNotification { notification: got } => assert_eq!(got, notification),
        other => panic!("unexpected response: {other:?}"),
    }
}

#[test]
fn item_modification_keeps_flag_sets_and_payload() {
    let changes = ItemChanges {
        added_flags: BTreeSet::from(["\\Seen".to_string()]),
        removed_flags: BTreeSet::from(["\\Flagged".to_string(), "$Junk".to_string()]),
        size: Some(3),
        payload: Some(vec![0, 159, 255]),
        ..ItemChanges::default()
    };
    assert!(!changes.is_empty());
    assert!(ItemChanges::default().is_empty());

    let modify = CommandEnvelope {
        tag: Tag(8),
        body: Command::ModifyItems {
            items: Scope::Uid(vec![5, 6]),
            revision: None,
            changes,
        },
    };
    let encoded = serde_cbor::to_vec(&modify).expect("command encode should succeed");
    let decoded: CommandEnvelope<Command> =
        serde_cbor::from_slice(&encoded).expect("command decode should succeed");
    assert_eq!(decoded, modify);
    assert_eq!(decoded.body.kind(), CommandKind::ModifyItems);
}
