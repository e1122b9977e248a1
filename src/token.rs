// Copyright 2023-2024 Trustoken Contributors
// See LICENSE.txt file for terms

//! The token façade: object lifecycle and processing entry points as
//! exposed to the command dispatcher.
//!
//! Every entry point runs to completion before returning; a failed
//! check never partially applies attribute changes. The ordering of the
//! policy checks within each entry point is part of the contract.

use std::collections::HashMap;

use crate::attribute::{Attribute, Attrs};
use crate::engine::{CryptoEngine, SoftEngine};
use crate::error::Result;
use crate::log::{trace_attributes, trustoken_log_init};
use crate::mechanism::{self, Function, MechanismInfo, Step};
use crate::object::builder::create_attributes_from_sanitized;
use crate::object::Object;
use crate::pkcs11::*;
use crate::policy;
use crate::sanitize::sanitize_client_template;
use crate::session::{Processing, Session, SessionUser};
use crate::storage::{MemoryStore, ObjectStore};

/// Attributes a copy operation may override on the new object
static COPY_SETTABLE: [CK_ATTRIBUTE_TYPE; 6] = [
    CKA_TOKEN,
    CKA_PRIVATE,
    CKA_MODIFIABLE,
    CKA_DESTROYABLE,
    CKA_SENSITIVE,
    CKA_EXTRACTABLE,
];

/// Attributes the token manages itself, never settable by clients
static NEVER_SETTABLE: [CK_ATTRIBUTE_TYPE; 5] = [
    CKA_CLASS,
    CKA_KEY_TYPE,
    CKA_LOCAL,
    CKA_ALWAYS_SENSITIVE,
    CKA_NEVER_EXTRACTABLE,
];

#[derive(Debug)]
pub struct Token {
    objects: HashMap<CK_OBJECT_HANDLE, Object>,
    sessions: HashMap<CK_SESSION_HANDLE, Session>,
    store: Box<dyn ObjectStore>,
    engine: Box<dyn CryptoEngine>,
    logged_user: SessionUser,
    next_object_handle: CK_OBJECT_HANDLE,
    next_session_handle: CK_SESSION_HANDLE,
}

impl Token {
    /// Creates a token backed by the software engine and the in-memory
    /// store
    pub fn new() -> Token {
        Token::with_collaborators(
            Box::new(SoftEngine::new()),
            Box::new(MemoryStore::new()),
        )
    }

    /// Creates a token with the given primitive engine and object store
    pub fn with_collaborators(
        engine: Box<dyn CryptoEngine>,
        store: Box<dyn ObjectStore>,
    ) -> Token {
        trustoken_log_init();
        Token {
            objects: HashMap::new(),
            sessions: HashMap::new(),
            store: store,
            engine: engine,
            logged_user: SessionUser::Public,
            next_object_handle: 1,
            next_session_handle: 1,
        }
    }

    /* Session management */

    pub fn open_session(&mut self, read_write: bool) -> CK_SESSION_HANDLE {
        let handle = self.next_session_handle;
        self.next_session_handle += 1;
        let mut session = Session::new(handle, read_write);
        session.set_user(self.logged_user);
        self.sessions.insert(handle, session);
        handle
    }

    /// Drops the session and every object private to it
    pub fn close_session(&mut self, handle: CK_SESSION_HANDLE) -> Result<()> {
        match self.sessions.remove(&handle) {
            Some(_) => (),
            None => return Err(CKR_SESSION_HANDLE_INVALID)?,
        }
        self.objects
            .retain(|_, o| o.is_token() || o.get_session() != handle);
        Ok(())
    }

    /// Authenticates a user on the token; sessions with a pending
    /// always-authenticate processing observe the re-login
    pub fn login(&mut self, user_type: CK_USER_TYPE) -> Result<()> {
        let user = match user_type {
            CKU_SO => SessionUser::SecurityOfficer,
            CKU_USER => SessionUser::User,
            _ => return Err(CKR_USER_TYPE_INVALID)?,
        };
        self.logged_user = user;
        for session in self.sessions.values_mut() {
            session.set_user(user);
        }
        Ok(())
    }

    pub fn logout(&mut self) -> Result<()> {
        if self.logged_user == SessionUser::Public {
            return Err(CKR_USER_NOT_LOGGED_IN)?;
        }
        self.logged_user = SessionUser::Public;
        for session in self.sessions.values_mut() {
            session.set_user(SessionUser::Public);
        }
        Ok(())
    }

    fn session(&self, handle: CK_SESSION_HANDLE) -> Result<&Session> {
        match self.sessions.get(&handle) {
            Some(s) => Ok(s),
            None => Err(CKR_SESSION_HANDLE_INVALID)?,
        }
    }

    fn session_mut(
        &mut self,
        handle: CK_SESSION_HANDLE,
    ) -> Result<&mut Session> {
        match self.sessions.get_mut(&handle) {
            Some(s) => Ok(s),
            None => Err(CKR_SESSION_HANDLE_INVALID)?,
        }
    }

    fn object(&self, handle: CK_OBJECT_HANDLE) -> Result<&Object> {
        match self.objects.get(&handle) {
            Some(o) => Ok(o),
            None => Err(CKR_OBJECT_HANDLE_INVALID)?,
        }
    }

    /* Mechanism catalog */

    /// All mechanisms the token actually exposes
    pub fn mechanism_list(&self) -> Vec<CK_MECHANISM_TYPE> {
        mechanism::token_mechanism_list()
    }

    pub fn mechanism_info(
        &self,
        mechanism_type: CK_MECHANISM_TYPE,
    ) -> Result<MechanismInfo> {
        mechanism::info(mechanism_type)
    }

    /* Object management */

    /// Assigns a handle to a built object and stores it either with the
    /// session or in the persistent store
    fn register_object(
        &mut self,
        s_handle: CK_SESSION_HANDLE,
        mut obj: Object,
    ) -> Result<CK_OBJECT_HANDLE> {
        match obj.get_class() {
            CKO_SECRET_KEY | CKO_PRIVATE_KEY => obj.set_zeroize(),
            _ => (),
        }
        let handle = self.next_object_handle;
        self.next_object_handle += 1;
        obj.set_handle(handle);
        if obj.is_token() {
            self.store.store(handle, &obj.serialize())?;
        } else {
            obj.set_session(s_handle);
        }
        self.objects.insert(handle, obj);
        Ok(handle)
    }

    /// Imports a client supplied object
    pub fn create_object(
        &mut self,
        s_handle: CK_SESSION_HANDLE,
        template: &[u8],
    ) -> Result<CK_OBJECT_HANDLE> {
        let temp = sanitize_client_template(template)?;
        let attrs =
            create_attributes_from_sanitized(&temp, None, Function::Import)?;
        {
            let session = self.session(s_handle)?;
            policy::check_created_attrs_against_token(session, &attrs)?;
        }
        policy::check_created_attrs_against_processing(
            PROCESSING_IMPORT,
            &attrs,
        )?;
        if crate::sanitize::class_is_key(attrs.get_class()) {
            policy::check_created_attrs(&attrs, None)?;
        }
        trace_attributes("import", &attrs);
        self.register_object(s_handle, Object::from_attributes(attrs))
    }

    /// Sanitizes a generation template and fills in the class and key
    /// type the mechanism dictates when the client omitted them
    fn complete_template(
        template: &[u8],
        class: CK_OBJECT_CLASS,
        key_type: CK_KEY_TYPE,
    ) -> Result<Attrs> {
        let mut temp = sanitize_client_template(template)?;
        match temp.get_class() {
            CKO_UNDEFINED => {
                temp.add(Attribute::from_ulong(CKA_CLASS, class))?
            }
            c if c == class => (),
            _ => return Err(CKR_TEMPLATE_INCONSISTENT)?,
        }
        match temp.get_key_type() {
            CKK_UNDEFINED => {
                temp.add(Attribute::from_ulong(CKA_KEY_TYPE, key_type))?
            }
            k if k == key_type => (),
            _ => return Err(CKR_TEMPLATE_INCONSISTENT)?,
        }
        Ok(temp)
    }

    /// Generates a symmetric key
    pub fn generate_key(
        &mut self,
        s_handle: CK_SESSION_HANDLE,
        mechanism_type: CK_MECHANISM_TYPE,
        template: &[u8],
    ) -> Result<CK_OBJECT_HANDLE> {
        if !mechanism::is_valid(mechanism_type) {
            return Err(CKR_MECHANISM_INVALID)?;
        }
        let key_type = match mechanism_type {
            CKM_AES_KEY_GEN => CKK_AES,
            CKM_GENERIC_SECRET_KEY_GEN => CKK_GENERIC_SECRET,
            _ => return Err(CKR_MECHANISM_INVALID)?,
        };

        let temp = Token::complete_template(
            template,
            CKO_SECRET_KEY,
            key_type,
        )?;
        let attrs = create_attributes_from_sanitized(
            &temp,
            None,
            Function::Generate,
        )?;
        {
            let session = self.session(s_handle)?;
            policy::check_mechanism_against_processing(
                session,
                mechanism_type,
                Function::Generate,
                Step::Init,
            )?;
            policy::check_created_attrs_against_token(session, &attrs)?;
        }
        policy::check_created_attrs_against_processing(
            mechanism_type,
            &attrs,
        )?;
        policy::check_created_attrs(&attrs, None)?;

        let mut key = Object::from_attributes(attrs);
        self.engine.generate_key(mechanism_type, &mut key)?;
        self.register_object(s_handle, key)
    }

    /// Generates an asymmetric key pair; both halves end up with the
    /// same CKA_ID
    pub fn generate_key_pair(
        &mut self,
        s_handle: CK_SESSION_HANDLE,
        mechanism_type: CK_MECHANISM_TYPE,
        public_template: &[u8],
        private_template: &[u8],
    ) -> Result<(CK_OBJECT_HANDLE, CK_OBJECT_HANDLE)> {
        if !mechanism::is_valid(mechanism_type) {
            return Err(CKR_MECHANISM_INVALID)?;
        }
        let key_type = match mechanism_type {
            CKM_RSA_PKCS_KEY_PAIR_GEN => CKK_RSA,
            CKM_EC_KEY_PAIR_GEN => CKK_EC,
            _ => return Err(CKR_MECHANISM_INVALID)?,
        };

        let public_temp = Token::complete_template(
            public_template,
            CKO_PUBLIC_KEY,
            key_type,
        )?;
        let private_temp = Token::complete_template(
            private_template,
            CKO_PRIVATE_KEY,
            key_type,
        )?;
        let public_attrs = create_attributes_from_sanitized(
            &public_temp,
            None,
            Function::GeneratePair,
        )?;
        let private_attrs = create_attributes_from_sanitized(
            &private_temp,
            None,
            Function::GeneratePair,
        )?;
        {
            let session = self.session(s_handle)?;
            policy::check_mechanism_against_processing(
                session,
                mechanism_type,
                Function::GeneratePair,
                Step::Init,
            )?;
            policy::check_created_attrs_against_token(
                session,
                &public_attrs,
            )?;
            policy::check_created_attrs_against_token(
                session,
                &private_attrs,
            )?;
        }
        policy::check_created_attrs_against_processing(
            mechanism_type,
            &public_attrs,
        )?;
        policy::check_created_attrs_against_processing(
            mechanism_type,
            &private_attrs,
        )?;
        policy::check_created_attrs(&public_attrs, Some(&private_attrs))?;

        let mut public_key = Object::from_attributes(public_attrs);
        let mut private_key = Object::from_attributes(private_attrs);
        self.engine.generate_key_pair(
            mechanism_type,
            &mut public_key,
            &mut private_key,
        )?;

        policy::add_missing_attribute_id(
            public_key.attributes_mut(),
            Some(private_key.attributes_mut()),
        )?;

        let public_handle = self.register_object(s_handle, public_key)?;
        let private_handle = self.register_object(s_handle, private_key)?;
        Ok((public_handle, private_handle))
    }

    /// Derives a new secret key from a parent key
    pub fn derive_key(
        &mut self,
        s_handle: CK_SESSION_HANDLE,
        mechanism_type: CK_MECHANISM_TYPE,
        parent_handle: CK_OBJECT_HANDLE,
        template: &[u8],
    ) -> Result<CK_OBJECT_HANDLE> {
        if !mechanism::is_valid(mechanism_type) {
            return Err(CKR_MECHANISM_INVALID)?;
        }
        let parent_attrs = {
            let parent = self.object(parent_handle)?;
            parent.attributes().clone()
        };
        {
            let session = self.session(s_handle)?;
            policy::check_mechanism_against_processing(
                session,
                mechanism_type,
                Function::Derive,
                Step::Init,
            )?;
            policy::check_access_attrs_against_token(session, &parent_attrs)?;
        }
        policy::check_parent_attrs_against_processing(
            mechanism_type,
            Function::Derive,
            &parent_attrs,
        )?;

        let temp = sanitize_client_template(template)?;
        let attrs = create_attributes_from_sanitized(
            &temp,
            Some(&parent_attrs),
            Function::Derive,
        )?;
        {
            let session = self.session(s_handle)?;
            policy::check_created_attrs_against_token(session, &attrs)?;
        }
        policy::check_created_attrs_against_processing(
            mechanism_type,
            &attrs,
        )?;

        let mut key = Object::from_attributes(attrs);
        self.engine
            .derive_key(mechanism_type, &parent_attrs, &mut key)?;
        self.register_object(s_handle, key)
    }

    /// Copies an object, honoring the PKCS#11 copy restrictions
    pub fn copy_object(
        &mut self,
        s_handle: CK_SESSION_HANDLE,
        o_handle: CK_OBJECT_HANDLE,
        template: &[u8],
    ) -> Result<CK_OBJECT_HANDLE> {
        let parent_attrs = {
            let session = self.session(s_handle)?;
            let parent = self.object(o_handle)?;
            policy::check_access_attrs_against_token(
                session,
                parent.attributes(),
            )?;
            if !parent.is_copyable() {
                return Err(CKR_ACTION_PROHIBITED)?;
            }
            parent.attributes().clone()
        };

        let temp = sanitize_client_template(template)?;
        for a in temp.iter() {
            if !COPY_SETTABLE.contains(&a.get_type()) {
                return Err(CKR_ATTRIBUTE_READ_ONLY)?;
            }
        }
        /* SENSITIVE may only change to true, EXTRACTABLE only to false */
        if let Some(a) = temp.find(CKA_SENSITIVE) {
            if parent_attrs.get_bool(CKA_SENSITIVE) && !a.to_bool()? {
                return Err(CKR_ATTRIBUTE_READ_ONLY)?;
            }
        }
        if let Some(a) = temp.find(CKA_EXTRACTABLE) {
            if !parent_attrs.get_bool(CKA_EXTRACTABLE) && a.to_bool()? {
                return Err(CKR_ATTRIBUTE_READ_ONLY)?;
            }
        }

        let mut attrs = parent_attrs.clone();
        for a in temp.iter() {
            attrs.set(a.clone())?;
        }

        if crate::sanitize::class_is_key(attrs.get_class()) {
            attrs.set(Attribute::from_bool(
                CKA_ALWAYS_SENSITIVE,
                parent_attrs.get_bool(CKA_ALWAYS_SENSITIVE)
                    && attrs.get_bool(CKA_SENSITIVE),
            ))?;
            attrs.set(Attribute::from_bool(
                CKA_NEVER_EXTRACTABLE,
                parent_attrs.get_bool(CKA_NEVER_EXTRACTABLE)
                    && !attrs.get_bool(CKA_EXTRACTABLE),
            ))?;
        }

        {
            let session = self.session(s_handle)?;
            policy::check_created_attrs_against_token(session, &attrs)?;
        }
        self.register_object(s_handle, Object::from_attributes(attrs))
    }

    /// Destroys an object, honoring CKA_DESTROYABLE
    pub fn destroy_object(
        &mut self,
        s_handle: CK_SESSION_HANDLE,
        o_handle: CK_OBJECT_HANDLE,
    ) -> Result<()> {
        {
            let session = self.session(s_handle)?;
            let obj = self.object(o_handle)?;
            policy::check_access_attrs_against_token(
                session,
                obj.attributes(),
            )?;
            if !obj.is_destroyable() {
                return Err(CKR_ACTION_PROHIBITED)?;
            }
        }
        let obj = match self.objects.remove(&o_handle) {
            Some(o) => o,
            None => return Err(CKR_OBJECT_HANDLE_INVALID)?,
        };
        if obj.is_token() {
            self.store.remove(o_handle)?;
        }
        Ok(())
    }

    /// Returns the requested attributes of an object, honoring the
    /// exportability predicate
    pub fn get_object_attrs(
        &self,
        s_handle: CK_SESSION_HANDLE,
        o_handle: CK_OBJECT_HANDLE,
        ids: &[CK_ATTRIBUTE_TYPE],
    ) -> Result<Attrs> {
        let session = self.session(s_handle)?;
        let obj = self.object(o_handle)?;
        policy::check_access_attrs_against_token(session, obj.attributes())?;

        let mut out = Attrs::new();
        for id in ids {
            if !policy::attribute_is_exportable(*id, obj) {
                return Err(CKR_ATTRIBUTE_SENSITIVE)?;
            }
            match obj.attributes().find(*id) {
                Some(a) => out.add(a.clone())?,
                None => return Err(CKR_ATTRIBUTE_TYPE_INVALID)?,
            }
        }
        Ok(out)
    }

    /// Modifies object attributes, honoring CKA_MODIFIABLE and the
    /// one-way transitions of the sensitivity attributes
    pub fn set_object_attrs(
        &mut self,
        s_handle: CK_SESSION_HANDLE,
        o_handle: CK_OBJECT_HANDLE,
        template: &[u8],
    ) -> Result<()> {
        let temp = sanitize_client_template(template)?;
        {
            let session = self.session(s_handle)?;
            let obj = self.object(o_handle)?;
            policy::check_access_attrs_against_token(
                session,
                obj.attributes(),
            )?;
            if !obj.is_modifiable() {
                return Err(CKR_ACTION_PROHIBITED)?;
            }
            if obj.is_token() && !session.is_read_write() {
                return Err(CKR_SESSION_READ_ONLY)?;
            }
            for a in temp.iter() {
                if NEVER_SETTABLE.contains(&a.get_type()) {
                    return Err(CKR_ATTRIBUTE_READ_ONLY)?;
                }
            }
            if let Some(a) = temp.find(CKA_SENSITIVE) {
                if obj.is_sensitive() && !a.to_bool()? {
                    return Err(CKR_ATTRIBUTE_READ_ONLY)?;
                }
            }
            if let Some(a) = temp.find(CKA_EXTRACTABLE) {
                if !obj.is_extractable() && a.to_bool()? {
                    return Err(CKR_ATTRIBUTE_READ_ONLY)?;
                }
            }
        }

        let obj = match self.objects.get_mut(&o_handle) {
            Some(o) => o,
            None => return Err(CKR_OBJECT_HANDLE_INVALID)?,
        };
        for a in temp.iter() {
            obj.set_attr(a.clone())?;
        }
        if obj.is_token() {
            let blob = obj.serialize();
            self.store.store(o_handle, &blob)?;
        }
        Ok(())
    }

    /* Processing state machine */

    /// Initializes a processing on the session for the given function,
    /// mechanism and key
    pub fn processing_init(
        &mut self,
        s_handle: CK_SESSION_HANDLE,
        function: Function,
        mechanism_type: CK_MECHANISM_TYPE,
        key_handle: CK_OBJECT_HANDLE,
    ) -> Result<()> {
        if !mechanism::is_valid(mechanism_type) {
            return Err(CKR_MECHANISM_INVALID)?;
        }
        let always_authen = {
            let session = self.session(s_handle)?;
            let key = self.object(key_handle)?;
            policy::check_mechanism_against_processing(
                session,
                mechanism_type,
                function,
                Step::Init,
            )?;
            policy::check_access_attrs_against_token(
                session,
                key.attributes(),
            )?;
            policy::check_parent_attrs_against_processing(
                mechanism_type,
                function,
                key.attributes(),
            )?;
            key.always_auth()
        };
        let session = self.session_mut(s_handle)?;
        session.set_processing(Processing::new(
            mechanism_type,
            function,
            always_authen,
        ))
    }

    /// Gates one step of the active processing; the data path itself is
    /// run by the primitive engine
    pub fn processing_step(
        &mut self,
        s_handle: CK_SESSION_HANDLE,
        step: Step,
    ) -> Result<()> {
        match step {
            Step::Oneshot | Step::Update | Step::Final => (),
            Step::Init => return Err(CKR_GENERAL_ERROR)?,
        }
        {
            let session = self.session(s_handle)?;
            let mechanism_type = session.processing()?.mechanism();
            let function = session.processing()?.function();
            policy::check_mechanism_against_processing(
                session,
                mechanism_type,
                function,
                step,
            )?;
        }
        let session = self.session_mut(s_handle)?;
        match step {
            Step::Update => session.processing_mut()?.set_updated(),
            Step::Oneshot | Step::Final => session.remove_processing(),
            Step::Init => (),
        }
        Ok(())
    }
}
