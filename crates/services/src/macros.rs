/// Implement [`Message`](vault_rpc::Message) for request types that are only
/// well-formed when the given name field is non-empty.
macro_rules! named_message {
    ($($message:ident . $field:ident),+ $(,)?) => {
        $(
            impl ::vault_rpc::Message for $message {
                fn is_well_formed(&self) -> bool {
                    !self.$field.is_empty()
                }
            }
        )+
    };
}

/// Implement [`Message`](vault_rpc::Message) with no well-formedness check.
macro_rules! plain_message {
    ($($message:ident),+ $(,)?) => {
        $( impl ::vault_rpc::Message for $message {} )+
    };
}

/// Declare a service group.
///
/// For group `G` and each operation `Op` this generates the `Op` marker
/// type, `G` implementing `ServiceGroup`, the `GService` skeleton trait
/// with a default method per operation, `bind_g` registering a skeleton on
/// a handler, and the typed `GClient`. `OpRequest` and `OpResponse` must be
/// in scope.
macro_rules! service_group {
    (
        $(#[$meta:meta])*
        group $group:ident = $name:literal {
            $( $operation:ident => $description:literal; )+
        }
    ) => {
        paste::paste! {
            $(#[$meta])*
            #[derive(Debug, Clone, Copy)]
            pub struct $group;

            impl ::vault_rpc::ServiceGroup for $group {
                const NAME: &'static str = $name;
                const OPERATIONS: &'static [::vault_rpc::OperationDefinition] = &[
                    $( ::vault_rpc::OperationDefinition::new($name, stringify!($operation), $description), )+
                ];
            }

            $(
                #[doc = $description]
                #[derive(Debug, Clone, Copy)]
                pub struct $operation;

                impl ::vault_rpc::Operation for $operation {
                    type Group = $group;
                    type Request = [<$operation Request>];
                    type Response = [<$operation Response>];
                    const NAME: &'static str = stringify!($operation);
                    const DESCRIPTION: &'static str = $description;
                }
            )+

            #[doc = "Callee side of the " $name " group."]
            ///
            /// Every method defaults to producing no response, which closes
            /// the exchange immediately.
            pub trait [<$group Service>]: Send + Sync + 'static {
                $(
                    #[doc = $description]
                    fn [<$operation:snake>](
                        &self,
                        origin: &::vault_transport::Origin,
                        request: &[<$operation Request>],
                    ) -> Option<[<$operation Response>]> {
                        let _ = (origin, request);
                        None
                    }
                )+
            }

            #[doc = "Subscribe every method of `service` to the " $name " request paths of `handler`."]
            ///
            /// # Errors
            ///
            /// Fails if the handler's registry does not contain the group.
            pub fn [<bind_ $group:snake>]<S>(
                handler: &::vault_rpc::MessageHandler,
                service: ::std::sync::Arc<S>,
            ) -> ::vault_rpc::Result<()>
            where
                S: [<$group Service>] + ?Sized,
            {
                $(
                    ::vault_rpc::bind_operation::<$operation, S, _>(
                        handler,
                        ::std::sync::Arc::clone(&service),
                        S::[<$operation:snake>],
                    )?;
                )+
                ::tracing::debug!(group = $name, "service bound");
                Ok(())
            }

            #[doc = "Typed caller for the " $name " group."]
            pub struct [<$group Client>]<F> {
                inner: ::vault_rpc::RpcClient<$group, F>,
            }

            impl<F> ::std::fmt::Debug for [<$group Client>]<F> {
                fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                    f.debug_struct(concat!(stringify!($group), "Client"))
                        .finish_non_exhaustive()
                }
            }

            impl<F> Clone for [<$group Client>]<F> {
                fn clone(&self) -> Self {
                    Self { inner: self.inner.clone() }
                }
            }

            impl<F: ::vault_transport::TransportFactory> [<$group Client>]<F> {
                /// Client creating one transport per call from `factory`.
                #[must_use]
                pub fn new(context: ::std::sync::Arc<::vault_rpc::RpcContext>, factory: F) -> Self {
                    Self {
                        inner: ::vault_rpc::RpcClient::new(context, factory),
                    }
                }

                /// The underlying client, for callback-style calls.
                #[must_use]
                pub const fn rpc(&self) -> &::vault_rpc::RpcClient<$group, F> {
                    &self.inner
                }

                $(
                    #[doc = $description]
                    pub async fn [<$operation:snake>](
                        &self,
                        destination: ::vault_transport::Endpoint,
                        request: [<$operation Request>],
                    ) -> (::vault_rpc::CallStatus, [<$operation Response>]) {
                        self.inner.request::<$operation>(destination, request).await
                    }
                )+
            }
        }
    };
}
